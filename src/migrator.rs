use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_create_catalog_tables::Migration)]
    }
}

mod m20240101_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::ParentSku).string().null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Slug).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Status).string().not_null())
                        .col(ColumnDef::new(Products::Features).text().null())
                        .col(ColumnDef::new(Products::Details).text().null())
                        .col(
                            ColumnDef::new(Products::IsParent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_parent_sku")
                        .table(Products::Table)
                        .col(Products::ParentSku)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_slug")
                        .table(Products::Table)
                        .col(Products::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductVariants::Sku).string().not_null())
                        .col(ColumnDef::new(ProductVariants::Color).string().not_null())
                        .col(ColumnDef::new(ProductVariants::WidthCm).integer().not_null())
                        .col(ColumnDef::new(ProductVariants::DropCm).integer().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::StockLevel)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProductVariants::Status).string().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variants_sku")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variants_product_id")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductAttributes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductAttributes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductAttributes::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(ProductAttributes::Scope).string().not_null())
                        .col(ColumnDef::new(ProductAttributes::Key).string().not_null())
                        .col(ColumnDef::new(ProductAttributes::Value).text().not_null())
                        .col(
                            ColumnDef::new(ProductAttributes::DataType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductAttributes::Category).string().null())
                        .col(
                            ColumnDef::new(ProductAttributes::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductAttributes::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_attributes_owner_key")
                        .table(ProductAttributes::Table)
                        .col(ProductAttributes::Scope)
                        .col(ProductAttributes::OwnerId)
                        .col(ProductAttributes::Key)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Barcodes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Barcodes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Barcodes::VariantId).uuid().not_null())
                        .col(ColumnDef::new(Barcodes::Value).string().not_null())
                        .col(ColumnDef::new(Barcodes::Symbology).string().not_null())
                        .col(
                            ColumnDef::new(Barcodes::AutoDetected)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Barcodes::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_barcodes_variant_id")
                        .table(Barcodes::Table)
                        .col(Barcodes::VariantId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Barcodes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductAttributes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        ParentSku,
        Name,
        Slug,
        Description,
        Status,
        Features,
        Details,
        IsParent,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ProductVariants {
        Table,
        Id,
        ProductId,
        Sku,
        Color,
        WidthCm,
        DropCm,
        Price,
        StockLevel,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ProductAttributes {
        Table,
        Id,
        OwnerId,
        Scope,
        Key,
        Value,
        DataType,
        Category,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Barcodes {
        Table,
        Id,
        VariantId,
        Value,
        Symbology,
        AutoDetected,
        CreatedAt,
    }
}
