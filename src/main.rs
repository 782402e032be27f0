use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use stockwar_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
    ws,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // 推送总线
    let hub = ws::Hub::new();

    // 创建服务
    let script_service = ScriptService::new(pool.clone());
    script_service
        .reload()
        .await
        .expect("Failed to load script cache");

    let game_service = GameService::new(
        pool.clone(),
        script_service.clone(),
        hub.clone(),
        config.game.clone(),
    );
    let leaderboard_service = LeaderboardService::new(pool.clone());
    let trade_service = TradeService::new(pool.clone(), script_service.clone(), config.game.clone());
    let settlement_service = SettlementService::new(
        pool.clone(),
        script_service.clone(),
        hub.clone(),
        leaderboard_service.clone(),
        config.game.clone(),
    );
    let auth_service = AuthService::new(
        pool.clone(),
        jwt_service.clone(),
        config.admin.secret.clone(),
        config.game.clone(),
    );
    let user_service = UserService::new(pool.clone(), hub.clone());
    let catalogue_service = CatalogueService::new(pool.clone());
    let minigame_engine = MiniGameEngine::new(
        pool.clone(),
        hub.clone(),
        leaderboard_service.clone(),
        script_service.clone(),
        config.game.clone(),
    );

    // 进程重启后恢复小游戏快照并重新布置定时器
    if let Err(e) = minigame_engine.rehydrate().await {
        log::error!("Minigame rehydration failed: {e:?}");
    }

    let ctx = AppContext {
        pool: pool.clone(),
        hub: hub.clone(),
        game: game_service.clone(),
        trade: trade_service.clone(),
        script: script_service.clone(),
        settlement: settlement_service.clone(),
        leaderboard: leaderboard_service.clone(),
        users: user_service.clone(),
        minigame: minigame_engine.clone(),
    };

    // 启动 1 Hz 游戏时钟
    tasks::spawn_all(ctx.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let cors_origin = config.cors.origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(cors_origin.clone()))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::new(ctx.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(game_service.clone()))
            .app_data(web::Data::new(script_service.clone()))
            .app_data(web::Data::new(catalogue_service.clone()))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .route("/ws", web::get().to(ws::ws_route))
            .service(
                web::scope("/api")
                    .configure(handlers::auth_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
