use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{events, health_check, orders, root, users};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login));

    let event_routes = Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/myevents", get(events::my_events))
        .route(
            "/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/:id/check-in", post(events::check_in));

    let order_routes = Router::new()
        .route("/create-payment-intent", post(orders::create_payment_intent))
        .route("/my-tickets", get(orders::my_tickets));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/users", user_routes)
        .nest("/api/events", event_routes)
        .nest("/api/orders", order_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}
