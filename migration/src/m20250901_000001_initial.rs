use sea_orm_migration::prelude::*;

/// Users (玩家与管理员共用一张表)
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    DisplayName,
    Avatar,
    Role,
    Cash,
    Stocks,
    Debt,
    DailyBorrowed,
    FirstSignIn,
    IsEmployee,
    AvatarUpdateCount,
    LoanSharkVisitCount,
    CreatedAt,
    UpdatedAt,
}

/// Game Status (全局单行, id 恒为 1)
#[derive(DeriveIden)]
enum GameStatus {
    Table,
    Id,
    IsStarted,
    GameStartTime,
    PausedAt,
    TimeRatio,
    TotalDays,
    InitialPrice,
    InitialCash,
    MaxLeverage,
    DailyInterestRate,
    MaxLoanAmount,
    UpdatedAt,
}

/// Script Days (剧本: 每个交易日的价格与新闻)
#[derive(DeriveIden)]
enum ScriptDays {
    Table,
    Id,
    Day,
    Price,
    Title,
    News,
    EffectiveTrend,
    PublishOffset,
    IsBroadcasted,
}

/// Events (剧本生成器的输入事件)
#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Day,
    Title,
    News,
    Trend,
    CreatedAt,
}

/// Contract Orders (杠杆合约订单, 永久保留用于审计)
#[derive(DeriveIden)]
enum ContractOrders {
    Table,
    Id,
    UserId,
    Day,
    OrderType,
    Leverage,
    Quantity,
    Margin,
    EntryPrice,
    IsSettled,
    IsCancelled,
    CreatedAt,
}

/// Red Envelope Items (红包奖品目录)
#[derive(DeriveIden)]
enum RedEnvelopeItems {
    Table,
    Id,
    Name,
    PrizeType,
    PrizeValue,
    Amount,
    DisplayOrder,
    IsActive,
}

/// Quiz Questions (抢答题目)
#[derive(DeriveIden)]
enum QuizQuestions {
    Table,
    Id,
    Question,
    OptionA,
    OptionB,
    OptionC,
    OptionD,
    CorrectAnswer,
    DurationSecs,
    SortOrder,
    RewardFirst,
    RewardSecond,
    RewardThird,
    RewardOthers,
}

/// Minority Questions (少数派投票题目)
#[derive(DeriveIden)]
enum MinorityQuestions {
    Table,
    Id,
    Question,
    OptionA,
    OptionB,
    OptionC,
    OptionD,
    DurationSecs,
    SortOrder,
}

/// MiniGame Runtime (小游戏运行时快照, key 恒为 CURRENT_GAME)
#[derive(DeriveIden)]
enum MinigameRuntime {
    Table,
    Key,
    GameType,
    Phase,
    StartTime,
    EndTime,
    Payload,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string_len(64).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Users::DisplayName)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::Avatar)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(16)
                            .not_null()
                            .default("USER"),
                    )
                    .col(
                        ColumnDef::new(Users::Cash)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Users::Stocks).big_integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Users::Debt)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::DailyBorrowed)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::FirstSignIn)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsEmployee)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::AvatarUpdateCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::LoanSharkVisitCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_username_unique")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 全局游戏状态单行表
        manager
            .create_table(
                Table::create()
                    .table(GameStatus::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GameStatus::Id).integer().not_null().primary_key())
                    .col(
                        ColumnDef::new(GameStatus::IsStarted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(GameStatus::GameStartTime).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(GameStatus::PausedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(GameStatus::TimeRatio)
                            .big_integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(GameStatus::TotalDays)
                            .integer()
                            .not_null()
                            .default(120),
                    )
                    .col(
                        ColumnDef::new(GameStatus::InitialPrice)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(GameStatus::InitialCash)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(10000),
                    )
                    .col(
                        ColumnDef::new(GameStatus::MaxLeverage)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(GameStatus::DailyInterestRate)
                            .decimal_len(10, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameStatus::MaxLoanAmount)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameStatus::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScriptDays::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScriptDays::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScriptDays::Day).integer().not_null())
                    .col(ColumnDef::new(ScriptDays::Price).decimal_len(15, 2).not_null())
                    .col(ColumnDef::new(ScriptDays::Title).string_len(255).null())
                    .col(ColumnDef::new(ScriptDays::News).text().null())
                    .col(
                        ColumnDef::new(ScriptDays::EffectiveTrend)
                            .string_len(16)
                            .not_null()
                            .default("FLAT"),
                    )
                    .col(ColumnDef::new(ScriptDays::PublishOffset).big_integer().null())
                    .col(
                        ColumnDef::new(ScriptDays::IsBroadcasted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_script_days_day_unique")
                    .table(ScriptDays::Table)
                    .col(ScriptDays::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Events::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Events::Day).integer().not_null())
                    .col(ColumnDef::new(Events::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Events::News).text().null())
                    .col(
                        ColumnDef::new(Events::Trend)
                            .string_len(16)
                            .not_null()
                            .default("NO_EFFECT"),
                    )
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_day")
                    .table(Events::Table)
                    .col(Events::Day)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContractOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContractOrders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContractOrders::UserId).big_integer().not_null())
                    .col(ColumnDef::new(ContractOrders::Day).integer().not_null())
                    .col(ColumnDef::new(ContractOrders::OrderType).string_len(8).not_null())
                    .col(ColumnDef::new(ContractOrders::Leverage).integer().not_null())
                    .col(ColumnDef::new(ContractOrders::Quantity).big_integer().not_null())
                    .col(ColumnDef::new(ContractOrders::Margin).decimal_len(15, 2).not_null())
                    .col(
                        ColumnDef::new(ContractOrders::EntryPrice)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractOrders::IsSettled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ContractOrders::IsCancelled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ContractOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 结算按 (day, 未结算) 扫描, 撤单按 (user, day) 扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contract_orders_day")
                    .table(ContractOrders::Table)
                    .col(ContractOrders::Day)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contract_orders_user_day")
                    .table(ContractOrders::Table)
                    .col(ContractOrders::UserId)
                    .col(ContractOrders::Day)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(ContractOrders::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_contract_orders_user")
                            .from_tbl(ContractOrders::Table)
                            .from_col(ContractOrders::UserId)
                            .to_tbl(Users::Table)
                            .to_col(Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RedEnvelopeItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedEnvelopeItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RedEnvelopeItems::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(RedEnvelopeItems::PrizeType)
                            .string_len(16)
                            .not_null()
                            .default("PHYSICAL"),
                    )
                    .col(
                        ColumnDef::new(RedEnvelopeItems::PrizeValue)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(RedEnvelopeItems::Amount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(RedEnvelopeItems::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RedEnvelopeItems::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuizQuestions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuizQuestions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuizQuestions::Question).text().not_null())
                    .col(ColumnDef::new(QuizQuestions::OptionA).string_len(255).not_null())
                    .col(ColumnDef::new(QuizQuestions::OptionB).string_len(255).not_null())
                    .col(ColumnDef::new(QuizQuestions::OptionC).string_len(255).not_null())
                    .col(ColumnDef::new(QuizQuestions::OptionD).string_len(255).not_null())
                    .col(ColumnDef::new(QuizQuestions::CorrectAnswer).string_len(1).not_null())
                    .col(
                        ColumnDef::new(QuizQuestions::DurationSecs)
                            .big_integer()
                            .not_null()
                            .default(30),
                    )
                    .col(ColumnDef::new(QuizQuestions::SortOrder).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(QuizQuestions::RewardFirst)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QuizQuestions::RewardSecond)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QuizQuestions::RewardThird)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QuizQuestions::RewardOthers)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MinorityQuestions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MinorityQuestions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MinorityQuestions::Question).text().not_null())
                    .col(ColumnDef::new(MinorityQuestions::OptionA).string_len(255).not_null())
                    .col(ColumnDef::new(MinorityQuestions::OptionB).string_len(255).not_null())
                    .col(ColumnDef::new(MinorityQuestions::OptionC).string_len(255).not_null())
                    .col(ColumnDef::new(MinorityQuestions::OptionD).string_len(255).not_null())
                    .col(
                        ColumnDef::new(MinorityQuestions::DurationSecs)
                            .big_integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(MinorityQuestions::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 小游戏运行时快照 (单行, 进程重启后恢复)
        manager
            .create_table(
                Table::create()
                    .table(MinigameRuntime::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MinigameRuntime::Key)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MinigameRuntime::GameType)
                            .string_len(16)
                            .not_null()
                            .default("NONE"),
                    )
                    .col(
                        ColumnDef::new(MinigameRuntime::Phase)
                            .string_len(16)
                            .not_null()
                            .default("IDLE"),
                    )
                    .col(ColumnDef::new(MinigameRuntime::StartTime).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(MinigameRuntime::EndTime).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(MinigameRuntime::Payload).json_binary().null())
                    .col(
                        ColumnDef::new(MinigameRuntime::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序: 先有外键引用的表
        manager
            .drop_table(Table::drop().if_exists().table(ContractOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(MinigameRuntime::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(MinorityQuestions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(QuizQuestions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(RedEnvelopeItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(ScriptDays::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(GameStatus::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
