use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Films::Table)
                    .if_not_exists()
                    .col(pk_auto(Films::Id))
                    .col(string(Films::Title))
                    .col(integer(Films::Favorite).default(0))
                    .col(string_null(Films::Watchdate))
                    .col(integer_null(Films::Rating))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_films_watchdate")
                    .table(Films::Table)
                    .col(Films::Watchdate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Films::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Films {
    Table,
    Id,
    Title,
    Favorite,
    Watchdate,
    Rating,
}
