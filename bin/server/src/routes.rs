//! API routes.
//!
//! Each artifact endpoint takes a customer record as its JSON body. The chat
//! endpoint keeps one conversation per caller, identified by an HTTP-only
//! cookie carrying the conversation ID.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use concierge_ai::OfferBundle;
use concierge_core::{ConversationId, CustomerRecord};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Conversation cookie name.
const CONVERSATION_COOKIE: &str = "conversation";

type Payload<T> = Result<Json<T>, JsonRejection>;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/persona", post(persona))
        .route("/greeting", post(greeting))
        .route("/offer", post(offer))
        .route("/offer/bundle", post(offer_bundle))
        .route("/payment-status", post(payment_status))
        .route("/chat", post(chat));

    Router::new()
        .route("/", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe.
pub async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

/// Classifies the customer's persona.
pub async fn persona(
    State(state): State<Arc<AppState>>,
    payload: Payload<CustomerRecord>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(customer) = payload?;
    let persona = state.pipeline.persona(&customer).await?;
    Ok(Json(json!({ "persona": persona })))
}

/// Generates a persona-toned greeting.
pub async fn greeting(
    State(state): State<Arc<AppState>>,
    payload: Payload<CustomerRecord>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(customer) = payload?;
    let greeting = state.pipeline.greeting(&customer).await?;
    Ok(Json(json!({ "greeting": greeting })))
}

/// Returns the offer notification under the `offer` key.
pub async fn offer(
    State(state): State<Arc<AppState>>,
    payload: Payload<CustomerRecord>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(customer) = payload?;
    let notification = state.pipeline.notification(&customer).await?;
    Ok(Json(json!({ "offer": notification })))
}

/// Returns the spending profile, offer and notification together.
pub async fn offer_bundle(
    State(state): State<Arc<AppState>>,
    payload: Payload<CustomerRecord>,
) -> Result<Json<OfferBundle>, ApiError> {
    let Json(customer) = payload?;
    Ok(Json(state.pipeline.offer_bundle(&customer).await?))
}

/// Reviews the customer's payment status.
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    payload: Payload<CustomerRecord>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(customer) = payload?;
    let message = state.pipeline.payment_status(&customer).await?;
    Ok(Json(json!({ "payment_notification": message })))
}

/// Body of a chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    user_input: Option<String>,
    #[serde(default)]
    customer_data: Option<CustomerRecord>,
}

/// Runs one chat turn in the caller's conversation.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Payload<ChatRequest>,
) -> Result<(CookieJar, Json<JsonValue>), ApiError> {
    let Json(request) = payload?;
    let user_input = request.user_input.filter(|s| !s.trim().is_empty());
    let customer = request.customer_data.filter(|c| !c.is_empty());
    let (Some(user_input), Some(customer)) = (user_input, customer) else {
        return Err(ApiError::BadRequest {
            reason: "user_input and customer_data are required".to_string(),
        });
    };

    let existing = match jar
        .get(CONVERSATION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<ConversationId>().ok())
    {
        Some(id) => state.sessions.get(id).await?,
        None => None,
    };
    let mut conversation = existing.unwrap_or_default();

    let response = state
        .chat
        .turn(&mut conversation, &customer, &user_input)
        .await?;

    let cookie = Cookie::build((CONVERSATION_COOKIE, conversation.id.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(state.session_config.idle_minutes_signed()));
    state.sessions.put(conversation).await?;

    Ok((jar.add(cookie), Json(json!({ "response": response }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use concierge_ai::testing::ScriptedBackend;
    use concierge_ai::{AnalysisPipeline, CompletionClient, DEFAULT_FALLBACK, FailurePolicy, LlmError};
    use concierge_conversation::{InMemorySessionStore, SessionStore};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        backend: Arc<ScriptedBackend>,
        sessions: Arc<InMemorySessionStore>,
    }

    fn app_with(backend: ScriptedBackend, policy: FailurePolicy, session: SessionConfig) -> TestApp {
        let backend = Arc::new(backend);
        let sessions = Arc::new(InMemorySessionStore::new());
        let pipeline = AnalysisPipeline::new(CompletionClient::new(backend.clone()))
            .with_policy(policy);
        let state = AppState::new(Arc::new(pipeline), sessions.clone(), session);
        TestApp {
            router: router(Arc::new(state)),
            backend,
            sessions,
        }
    }

    fn app(backend: ScriptedBackend) -> TestApp {
        app_with(backend, FailurePolicy::Fallback, SessionConfig::default())
    }

    struct Reply {
        status: StatusCode,
        set_cookie: Option<String>,
        body: JsonValue,
    }

    async fn post_json(router: &Router, uri: &str, body: JsonValue, cookie: Option<&str>) -> Reply {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();

        let res = router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);

        Reply {
            status,
            set_cookie,
            body,
        }
    }

    fn maria() -> JsonValue {
        json!({"Nome": "Maria", "Idade": 70, "SeniorCitizen": 1, "gender": "Female"})
    }

    fn billing_customer() -> JsonValue {
        json!({
            "customerID": "3668-QPYBK",
            "Nome": "Nicolas",
            "Idade": 20,
            "RendaReais": 2100,
            "Partner": "No",
            "Dependents": "No",
            "PhoneService": "Yes",
            "InternetService": "DSL",
            "MonthlyCharges": 53.85,
            "DeviceProtection": "No",
            "StreamingTV": "Yes",
            "StreamingMovies": "Yes",
            "Contract": "Month-to-month",
            "PaymentMethod": "Mailed check",
            "TotalCharges": 108.15,
            "TVUsageHours": 40,
            "InternetUsageGB": 300,
            "PhoneUsageHours": 5,
            "PreviousPurchases": 2,
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app(ScriptedBackend::new());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let res = app.router.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn persona_returns_generated_text() {
        let app = app(ScriptedBackend::new().reply("Persona Dona Maria"));

        let reply = post_json(&app.router, "/api/persona", maria(), None).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({"persona": "Persona Dona Maria"}));
    }

    #[tokio::test]
    async fn greeting_embeds_fallback_after_timeout() {
        let app = app(
            ScriptedBackend::new()
                .fail(LlmError::Timeout)
                .fail(LlmError::Timeout),
        );

        let reply = post_json(&app.router, "/api/greeting", maria(), None).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["greeting"], DEFAULT_FALLBACK);
        assert!(app.backend.prompts()[1].contains(DEFAULT_FALLBACK));
    }

    #[tokio::test]
    async fn propagate_policy_maps_timeout_to_bad_gateway() {
        let app = app_with(
            ScriptedBackend::new().fail(LlmError::Timeout),
            FailurePolicy::Propagate,
            SessionConfig::default(),
        );

        let reply = post_json(&app.router, "/api/persona", maria(), None).await;

        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert!(reply.body["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn offer_returns_the_notification() {
        let app = app(
            ScriptedBackend::new()
                .reply("Budget streamer")
                .reply("Want more channels for less?"),
        );

        let reply = post_json(&app.router, "/api/offer", billing_customer(), None).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({"offer": "Want more channels for less?"}));
        assert!(app.backend.prompts()[1].contains("personalized offer notification"));
    }

    #[tokio::test]
    async fn offer_bundle_returns_all_three_texts() {
        let app = app(
            ScriptedBackend::new()
                .reply("Budget streamer")
                .reply("Streaming add-on")
                .reply("Want more channels for less?"),
        );

        let reply = post_json(&app.router, "/api/offer/bundle", billing_customer(), None).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            reply.body,
            json!({
                "spending_profile": "Budget streamer",
                "offer": "Streaming add-on",
                "notification": "Want more channels for less?",
            })
        );
    }

    #[tokio::test]
    async fn missing_field_is_an_internal_error() {
        let app = app(ScriptedBackend::new());

        let reply = post_json(&app.router, "/api/payment-status", maria(), None).await;

        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(reply.body["error"].as_str().unwrap().contains("PaymentMethod"));
        assert!(app.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn non_object_body_is_a_bad_request() {
        let app = app(ScriptedBackend::new());

        let reply = post_json(&app.router, "/api/persona", json!(["Maria"]), None).await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(reply.body["error"].is_string());
    }

    #[tokio::test]
    async fn chat_requires_input_and_customer() {
        let app = app(ScriptedBackend::new());

        for body in [
            json!({"customer_data": maria()}),
            json!({"user_input": "", "customer_data": maria()}),
            json!({"user_input": "Hi"}),
            json!({"user_input": "Hi", "customer_data": {}}),
        ] {
            let reply = post_json(&app.router, "/api/chat", body, None).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST);
            assert!(reply.body["error"].is_string());
        }
        assert!(app.backend.requests().is_empty());
        assert!(app.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn chat_keeps_history_across_requests() {
        let app = app(
            ScriptedBackend::new()
                .reply("Persona Dona Maria")
                .reply("Good morning, Maria!")
                .reply("Your bill is R$ 89,10.")
                .reply("It is due on the 10th."),
        );
        let first = json!({"user_input": "How much is my bill?", "customer_data": maria()});

        let reply = post_json(&app.router, "/api/chat", first, None).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({"response": "Your bill is R$ 89,10."}));
        let cookie = reply.set_cookie.expect("conversation cookie");
        assert!(cookie.starts_with("conversation=conv_"));

        let id: ConversationId = cookie["conversation=".len()..].parse().unwrap();
        let conversation = app.sessions.get(id).await.unwrap().expect("stored");
        assert_eq!(conversation.message_count(), 3);

        let second = json!({"user_input": "When is it due?", "customer_data": maria()});
        let reply = post_json(&app.router, "/api/chat", second, Some(&cookie)).await;

        assert_eq!(reply.body["response"], "It is due on the 10th.");
        let conversation = app.sessions.get(id).await.unwrap().expect("stored");
        assert_eq!(conversation.message_count(), 5);
        assert_eq!(app.sessions.len().await, 1);

        let last_request = app.backend.requests().pop().expect("request");
        assert_eq!(last_request.messages.len(), 4);
        assert_eq!(last_request.messages[0].content, "Good morning, Maria!");
    }

    #[tokio::test]
    async fn unknown_conversation_cookie_starts_fresh() {
        let app = app(ScriptedBackend::new());
        let stale = format!("{CONVERSATION_COOKIE}={}", ConversationId::new());
        let body = json!({"user_input": "Hi", "customer_data": maria()});

        let reply = post_json(&app.router, "/api/chat", body, Some(&stale)).await;

        assert_eq!(reply.status, StatusCode::OK);
        let cookie = reply.set_cookie.expect("conversation cookie");
        assert_ne!(cookie, stale);
        assert_eq!(app.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn failed_chat_greeting_is_a_bad_gateway_with_its_cause() {
        let app = app_with(
            ScriptedBackend::new().fail(LlmError::Timeout),
            FailurePolicy::Propagate,
            SessionConfig::default(),
        );
        let body = json!({"user_input": "Hi", "customer_data": maria()});

        let reply = post_json(&app.router, "/api/chat", body, None).await;

        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        let error = reply.body["error"].as_str().unwrap();
        assert!(error.contains("greeting failed"), "{error}");
        assert!(error.contains("timed out"), "{error}");
        assert!(app.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn longest_idle_timeout_still_sets_the_cookie() {
        let session = SessionConfig {
            idle_minutes: u32::MAX,
            ..SessionConfig::default()
        };
        let app = app_with(ScriptedBackend::new(), FailurePolicy::Fallback, session);
        let body = json!({"user_input": "Hi", "customer_data": maria()});

        let reply = post_json(&app.router, "/api/chat", body, None).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.set_cookie.is_some());
        assert_eq!(app.sessions.len().await, 1);
    }
}
