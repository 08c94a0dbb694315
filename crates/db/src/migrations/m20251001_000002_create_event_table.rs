//! Create event and event vote tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Event::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Event::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Event::Description).text())
                    .col(ColumnDef::new(Event::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Event::Status)
                            .string_len(16)
                            .not_null()
                            .default("open"),
                    )
                    .col(ColumnDef::new(Event::Category).string_len(16).not_null())
                    .col(ColumnDef::new(Event::CreatorId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Event::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Event::FinalizedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Event::FinalDate).string_len(64))
                    .col(ColumnDef::new(Event::FinalLocation).string_len(512))
                    .col(ColumnDef::new(Event::FinalDetails).text())
                    .check(Expr::col(Event::Kind).is_in(["poll", "discussion", "announcement"]))
                    .check(Expr::col(Event::Status).is_in(["open", "finalized", "cancelled"]))
                    .check(
                        Expr::col(Event::Category)
                            .is_in(["cinema", "food", "games", "sports", "other"]),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_creator")
                            .from(Event::Table, Event::CreatorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (status, category) for list filters
        manager
            .create_index(
                Index::create()
                    .name("idx_event_status_category")
                    .table(Event::Table)
                    .col(Event::Status)
                    .col(Event::Category)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (listing order)
        manager
            .create_index(
                Index::create()
                    .name("idx_event_created_at")
                    .table(Event::Table)
                    .col(Event::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventVote::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(EventVote::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(EventVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_vote_event")
                            .from(EventVote::Table, EventVote::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_vote_user")
                            .from(EventVote::Table, EventVote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (event_id, user_id) - one upvote per member per event
        manager
            .create_index(
                Index::create()
                    .name("idx_event_vote_event_user")
                    .table(EventVote::Table)
                    .col(EventVote::EventId)
                    .col(EventVote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventVote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
    Title,
    Description,
    Kind,
    Status,
    Category,
    CreatorId,
    CreatedAt,
    FinalizedAt,
    FinalDate,
    FinalLocation,
    FinalDetails,
}

#[derive(Iden)]
enum EventVote {
    Table,
    Id,
    EventId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
