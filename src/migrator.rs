use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_organizations::Migration),
            Box::new(m20240101_000002_create_products_and_customers::Migration),
            Box::new(m20240101_000003_create_documents::Migration),
            Box::new(m20240101_000004_create_ledger_entries::Migration),
            Box::new(m20240101_000005_create_alert_snoozes::Migration),
        ]
    }
}

mod m20240101_000001_create_organizations {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_organizations"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Organizations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Organizations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Organizations::Name).string().not_null())
                        .col(ColumnDef::new(Organizations::ContactEmail).string().null())
                        .col(
                            ColumnDef::new(Organizations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrganizationSettings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrganizationSettings::OrganizationId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::NotifyLowStock)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::NotifyPendingOrders)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::NotifyReceivables)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::NotifyPayables)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::LowStockThreshold)
                                .integer()
                                .not_null()
                                .default(5),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::PendingOrderAgingHours)
                                .big_integer()
                                .not_null()
                                .default(24),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::ReceivableReminderDays)
                                .big_integer()
                                .not_null()
                                .default(7),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::PayableReminderDays)
                                .big_integer()
                                .not_null()
                                .default(7),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::EmailAlerts)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(OrganizationSettings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrganizationSettings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Organizations::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Organizations {
        Table,
        Id,
        Name,
        ContactEmail,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
        OrganizationId,
        Email,
        Name,
        Active,
        CreatedAt,
    }

    #[derive(Iden)]
    enum OrganizationSettings {
        Table,
        OrganizationId,
        NotifyLowStock,
        NotifyPendingOrders,
        NotifyReceivables,
        NotifyPayables,
        LowStockThreshold,
        PendingOrderAgingHours,
        ReceivableReminderDays,
        PayableReminderDays,
        EmailAlerts,
        UpdatedAt,
    }
}

mod m20240101_000002_create_products_and_customers {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_products_and_customers"
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
                        .col(ColumnDef::new(Products::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string()
                                .not_null()
                                .default("pcs"),
                        )
                        .col(
                            ColumnDef::new(Products::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::PurchasePrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::TargetPrice).decimal().null())
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::LowStockThreshold)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_org")
                        .table(Products::Table)
                        .col(Products::OrganizationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_customers_org")
                        .table(Customers::Table)
                        .col(Customers::OrganizationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        OrganizationId,
        Name,
        Unit,
        UnitPrice,
        PurchasePrice,
        TargetPrice,
        StockQuantity,
        Active,
        LowStockThreshold,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Customers {
        Table,
        Id,
        OrganizationId,
        Name,
        Phone,
        CreatedAt,
    }
}

mod m20240101_000003_create_documents {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_documents"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Documents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Documents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Documents::OrganizationId).uuid().not_null())
                        .col(ColumnDef::new(Documents::Kind).string().not_null())
                        .col(ColumnDef::new(Documents::Status).string().null())
                        .col(ColumnDef::new(Documents::CustomerId).uuid().null())
                        .col(ColumnDef::new(Documents::VendorName).string().null())
                        .col(ColumnDef::new(Documents::VendorPhone).string().null())
                        .col(ColumnDef::new(Documents::ShortCode).string().null())
                        .col(
                            ColumnDef::new(Documents::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Documents::Discount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Documents::PaidAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Documents::TransportPerTrip)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Documents::TransportTrips)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Documents::TransportTotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Documents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Documents::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_documents_org_kind")
                        .table(Documents::Table)
                        .col(Documents::OrganizationId)
                        .col(Documents::Kind)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LineItems::DocumentId).uuid().not_null())
                        .col(ColumnDef::new(LineItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(LineItems::ProductName).string().not_null())
                        .col(ColumnDef::new(LineItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(LineItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(LineItems::LineTotal).decimal().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_line_items_document")
                                .from(LineItems::Table, LineItems::DocumentId)
                                .to(Documents::Table, Documents::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_line_items_document")
                        .table(LineItems::Table)
                        .col(LineItems::DocumentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Documents::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Documents {
        Table,
        Id,
        OrganizationId,
        Kind,
        Status,
        CustomerId,
        VendorName,
        VendorPhone,
        ShortCode,
        Total,
        Discount,
        PaidAmount,
        TransportPerTrip,
        TransportTrips,
        TransportTotal,
        CreatedAt,
        DeliveredAt,
    }

    #[derive(Iden)]
    enum LineItems {
        Table,
        Id,
        DocumentId,
        ProductId,
        ProductName,
        Quantity,
        UnitPrice,
        LineTotal,
    }
}

mod m20240101_000004_create_ledger_entries {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_ledger_entries"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LedgerEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LedgerEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LedgerEntries::OrganizationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LedgerEntries::Description)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LedgerEntries::EntryType).string().not_null())
                        .col(ColumnDef::new(LedgerEntries::Amount).decimal().not_null())
                        .col(ColumnDef::new(LedgerEntries::Category).string().not_null())
                        .col(
                            ColumnDef::new(LedgerEntries::EntryDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LedgerEntries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_ledger_entries_org")
                        .table(LedgerEntries::Table)
                        .col(LedgerEntries::OrganizationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum LedgerEntries {
        Table,
        Id,
        OrganizationId,
        Description,
        EntryType,
        Amount,
        Category,
        EntryDate,
        CreatedAt,
    }
}

mod m20240101_000005_create_alert_snoozes {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_alert_snoozes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AlertSnoozes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AlertSnoozes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertSnoozes::OrganizationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AlertSnoozes::Category).string().not_null())
                        .col(ColumnDef::new(AlertSnoozes::RefId).uuid().not_null())
                        .col(
                            ColumnDef::new(AlertSnoozes::Until)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AlertSnoozes::Permanent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(AlertSnoozes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertSnoozes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_alert_snoozes_org_category")
                        .table(AlertSnoozes::Table)
                        .col(AlertSnoozes::OrganizationId)
                        .col(AlertSnoozes::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AlertSnoozes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum AlertSnoozes {
        Table,
        Id,
        OrganizationId,
        Category,
        RefId,
        Until,
        Permanent,
        CreatedAt,
        UpdatedAt,
    }
}
