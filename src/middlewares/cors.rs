use actix_cors::Cors;

pub fn create_cors(origin: Option<String>) -> Cors {
    let cors = match origin {
        Some(origin) if origin != "*" => Cors::default().allowed_origin(&origin),
        // 未配置时放开, 生产环境应设置 CORS_ORIGIN
        _ => Cors::default().allowed_origin_fn(|_, _req_head| true),
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}
