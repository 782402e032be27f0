use crate::error::{AppError, AppResult};
use crate::models::{
    AdminMiniGameActionPayload, BuyContractPayload, LoanPayload, MiniGameActionPayload,
    SpotPayload, UserRole,
};
use crate::services::AppContext;
use crate::utils::JwtService;
use crate::ws::events::{self as evt, IncomingMessage};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_ws::Message;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
}

/// WS 握手: 校验签名令牌, 注册到推送总线, 下发一次完整快照,
/// 然后由本连接独占的任务处理双向消息
pub async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    jwt: web::Data<JwtService>,
    ctx: web::Data<AppContext>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, Error> {
    let claims = jwt.verify_token(&query.token)?;
    let user_id = claims.user_id()?;
    let role = claims.role;

    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let ctx = ctx.get_ref().clone();
    let sid = ctx.hub.register(user_id, role, tx);
    log::info!("WS connected: user {user_id} (session {sid})");

    actix_web::rt::spawn(async move {
        // 每个连接恰好一条 FULL_SYNC_STATE
        match ctx.full_sync_state(user_id).await {
            Ok(payload) => ctx.hub.to_session(sid, evt::FULL_SYNC_STATE, &payload),
            Err(e) => log::error!("FULL_SYNC_STATE for user {user_id} failed: {e}"),
        }

        loop {
            tokio::select! {
                maybe_text = rx.recv() => match maybe_text {
                    Some(text) => {
                        if session.text(text).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                maybe_msg = msg_stream.next() => match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&ctx, sid, user_id, role, &text).await;
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        let _ = session.pong(&bytes).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                },
            }
        }

        ctx.hub.unregister(sid);
        let _ = session.close(None).await;
        log::info!("WS disconnected: user {user_id} (session {sid})");
    });

    Ok(response)
}

/// 错误只回给发起连接, 绝不广播
async fn dispatch(ctx: &AppContext, sid: u64, user_id: i64, role: UserRole, text: &str) {
    let msg: IncomingMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            ctx.hub.to_session(
                sid,
                evt::TRADE_ERROR,
                &json!({ "code": "INVALID_INPUT", "message": format!("无法解析消息: {e}") }),
            );
            return;
        }
    };

    let event = msg.event.clone();
    if let Err(e) = handle_event(ctx, sid, user_id, role, &event, msg.payload).await {
        let error_event = match event.as_str() {
            evt::MINIGAME_ACTION | evt::ADMIN_MINIGAME_ACTION => evt::MINIGAME_EVENT,
            _ => evt::TRADE_ERROR,
        };
        let payload = if error_event == evt::MINIGAME_EVENT {
            json!({ "type": "ERROR", "code": e.kind(), "message": e.to_string() })
        } else {
            json!({ "code": e.kind(), "message": e.to_string() })
        };
        ctx.hub.to_session(sid, error_event, &payload);
    }
}

fn payload_of<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(value).map_err(|e| AppError::Validation(format!("无效的消息负载: {e}")))
}

async fn handle_event(
    ctx: &AppContext,
    sid: u64,
    user_id: i64,
    role: UserRole,
    event: &str,
    payload: serde_json::Value,
) -> AppResult<()> {
    match event {
        evt::BUY_STOCK => {
            let p: SpotPayload = payload_of(payload)?;
            let result = ctx.trade.buy_stock(user_id, p.quantity).await?;
            ctx.hub.to_session(sid, evt::TRADE_SUCCESS, &result);
        }
        evt::SELL_STOCK => {
            let p: SpotPayload = payload_of(payload)?;
            let result = ctx.trade.sell_stock(user_id, p.quantity).await?;
            ctx.hub.to_session(sid, evt::TRADE_SUCCESS, &result);
        }
        evt::BUY_CONTRACT => {
            let p: BuyContractPayload = payload_of(payload)?;
            let result = ctx
                .trade
                .open_contract(user_id, p.order_type, p.leverage, p.quantity)
                .await?;
            ctx.hub.to_session(sid, evt::TRADE_SUCCESS, &result);
        }
        evt::CANCEL_CONTRACT => {
            let result = ctx.trade.cancel_contracts(user_id).await?;
            ctx.hub.to_session(sid, evt::TRADE_SUCCESS, &result);
        }
        evt::BORROW_MONEY => {
            let p: LoanPayload = payload_of(payload)?;
            let result = ctx.trade.borrow(user_id, p.amount).await?;
            ctx.hub.to_session(sid, evt::TRADE_SUCCESS, &result);
        }
        evt::REPAY_MONEY => {
            let p: LoanPayload = payload_of(payload)?;
            let result = ctx.trade.repay(user_id, p.amount).await?;
            ctx.hub.to_session(sid, evt::TRADE_SUCCESS, &result);
        }
        evt::VISIT_LOAN_SHARK => {
            let result = ctx.users.visit_loan_shark(user_id).await?;
            ctx.hub
                .to_session(sid, evt::LOAN_SHARK_VISIT_UPDATE, &result);
        }
        evt::MINIGAME_ACTION => {
            let p: MiniGameActionPayload = payload_of(payload)?;
            ctx.minigame.handle_action(user_id, p).await?;
        }
        evt::ADMIN_MINIGAME_ACTION => {
            let p: AdminMiniGameActionPayload = payload_of(payload)?;
            ctx.minigame.handle_admin_action(user_id, role, p).await?;
        }
        other => {
            return Err(AppError::Validation(format!("未知事件: {other}")));
        }
    }
    Ok(())
}
