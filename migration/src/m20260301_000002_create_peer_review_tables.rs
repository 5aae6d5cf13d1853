use sea_orm_migration::prelude::*;

use crate::m20260301_000001_create_tables::{RubricCriteria, Submissions, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建互评表
        manager
            .create_table(
                Table::create()
                    .table(PeerReviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PeerReviews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PeerReviews::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeerReviews::ReviewerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PeerReviews::Status).string().not_null())
                    .col(
                        ColumnDef::new(PeerReviews::IsAiGenerated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PeerReviews::IsReleased)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(PeerReviews::OverallFeedback).text().null())
                    .col(ColumnDef::new(PeerReviews::TotalScore).double().null())
                    .col(
                        ColumnDef::new(PeerReviews::AssignedDate)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeerReviews::CompletedDate)
                            .big_integer()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PeerReviews::Table, PeerReviews::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PeerReviews::Table, PeerReviews::ReviewerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评分明细表
        manager
            .create_table(
                Table::create()
                    .table(ReviewScores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReviewScores::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReviewScores::PeerReviewId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReviewScores::CriterionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReviewScores::Score).double().not_null())
                    .col(ColumnDef::new(ReviewScores::Feedback).text().null())
                    .col(
                        ColumnDef::new(ReviewScores::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ReviewScores::Table, ReviewScores::PeerReviewId)
                            .to(PeerReviews::Table, PeerReviews::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ReviewScores::Table, ReviewScores::CriterionId)
                            .to(RubricCriteria::Table, RubricCriteria::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一提交同一评审人只能有一条互评记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("uq_peer_reviews_submission_reviewer")
                    .table(PeerReviews::Table)
                    .col(PeerReviews::SubmissionId)
                    .col(PeerReviews::ReviewerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_peer_reviews_reviewer_id")
                    .table(PeerReviews::Table)
                    .col(PeerReviews::ReviewerId)
                    .to_owned(),
            )
            .await?;

        // 发布闸门按 (is_ai_generated, is_released) 做批量筛选
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_peer_reviews_release")
                    .table(PeerReviews::Table)
                    .col(PeerReviews::IsAiGenerated)
                    .col(PeerReviews::IsReleased)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("uq_review_scores_review_criterion")
                    .table(ReviewScores::Table)
                    .col(ReviewScores::PeerReviewId)
                    .col(ReviewScores::CriterionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReviewScores::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PeerReviews::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum PeerReviews {
    #[sea_orm(iden = "peer_reviews")]
    Table,
    Id,
    SubmissionId,
    ReviewerId,
    Status,
    IsAiGenerated,
    IsReleased,
    OverallFeedback,
    TotalScore,
    AssignedDate,
    CompletedDate,
}

#[derive(DeriveIden)]
enum ReviewScores {
    #[sea_orm(iden = "review_scores")]
    Table,
    Id,
    PeerReviewId,
    CriterionId,
    Score,
    Feedback,
    UpdatedAt,
}
