//! Create participation table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Participation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participation::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Participation::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Participation::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Participation::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Participation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Participation::Status).is_in(["going", "maybe", "notGoing"]))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participation_event")
                            .from(Participation::Table, Participation::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participation_user")
                            .from(Participation::Table, Participation::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (event_id, user_id) - one stated intent per member per event
        manager
            .create_index(
                Index::create()
                    .name("idx_participation_event_user")
                    .table(Participation::Table)
                    .col(Participation::EventId)
                    .col(Participation::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Participation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Participation {
    Table,
    Id,
    EventId,
    UserId,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
