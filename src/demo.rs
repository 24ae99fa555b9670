//! Order demo - A tiny order book wired through the mediator

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use mediator::{
    CancellationToken, Command, CommandHandler, Config, HandlerResult, Mediator, MediatorError,
    Notification, NotificationHandler, Query, QueryHandler, ResponseCommand, ResponseCommandHandler,
    Sender,
};

/// Shared order storage
pub type OrderStore = Arc<RwLock<HashMap<String, OrderDto>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderId(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct OrderDto {
    pub id: String,
    pub customer: String,
    pub items: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[error("Order not found: {0}")]
pub struct OrderNotFound(pub String);

pub struct CreateOrder {
    pub customer: String,
    pub items: Vec<String>,
}

impl ResponseCommand for CreateOrder {
    type Response = OrderId;
}

pub struct CancelOrder {
    pub id: String,
}

impl Command for CancelOrder {}

pub struct GetOrder {
    pub id: String,
}

impl Query for GetOrder {
    type Response = OrderDto;
}

pub struct OrderCreated {
    pub id: String,
    pub customer: String,
}

impl Notification for OrderCreated {}

struct CreateOrderHandler {
    store: OrderStore,
}

#[async_trait]
impl ResponseCommandHandler<CreateOrder> for CreateOrderHandler {
    async fn handle(&self, command: &CreateOrder, cancel: &CancellationToken) -> HandlerResult<OrderId> {
        cancel.check()?;

        let id = Uuid::new_v4().to_string();
        let order = OrderDto {
            id: id.clone(),
            customer: command.customer.clone(),
            items: command.items.clone(),
            status: "open".to_string(),
            created_at: Utc::now(),
        };
        self.store.write().await.insert(id.clone(), order);
        Ok(OrderId(id))
    }
}

struct CancelOrderHandler {
    store: OrderStore,
}

#[async_trait]
impl CommandHandler<CancelOrder> for CancelOrderHandler {
    async fn handle(&self, command: &CancelOrder, _cancel: &CancellationToken) -> HandlerResult<()> {
        let mut orders = self.store.write().await;
        let order = orders
            .get_mut(&command.id)
            .ok_or_else(|| OrderNotFound(command.id.clone()))?;
        order.status = "cancelled".to_string();
        Ok(())
    }
}

struct GetOrderHandler {
    store: OrderStore,
}

#[async_trait]
impl QueryHandler<GetOrder> for GetOrderHandler {
    async fn handle(&self, query: &GetOrder, _cancel: &CancellationToken) -> HandlerResult<OrderDto> {
        let orders = self.store.read().await;
        match orders.get(&query.id) {
            Some(order) => Ok(order.clone()),
            None => Err(OrderNotFound(query.id.clone()).into()),
        }
    }
}

struct ConfirmationMailer;

#[async_trait]
impl NotificationHandler<OrderCreated> for ConfirmationMailer {
    async fn handle(&self, notification: &OrderCreated, _cancel: &CancellationToken) -> HandlerResult<()> {
        tracing::info!("Confirmation sent to {} for order {}", notification.customer, notification.id);
        Ok(())
    }
}

struct InventoryReserver {
    store: OrderStore,
}

#[async_trait]
impl NotificationHandler<OrderCreated> for InventoryReserver {
    async fn handle(&self, notification: &OrderCreated, _cancel: &CancellationToken) -> HandlerResult<()> {
        let orders = self.store.read().await;
        let items = orders
            .get(&notification.id)
            .map(|order| order.items.len())
            .unwrap_or(0);
        tracing::info!("Reserved {} item(s) for order {}", items, notification.id);
        Ok(())
    }
}

/// Build a mediator with every order handler registered against `store`
pub fn build_mediator(config: &Config, store: OrderStore) -> Mediator {
    let create_store = store.clone();
    let cancel_store = store.clone();
    let get_store = store.clone();

    Mediator::builder()
        .with_config(config)
        .response_command_handler::<CreateOrder, _>(move |_| CreateOrderHandler {
            store: create_store.clone(),
        })
        .command_handler::<CancelOrder, _>(move |_| CancelOrderHandler {
            store: cancel_store.clone(),
        })
        .query_handler::<GetOrder, _>(move |_| GetOrderHandler {
            store: get_store.clone(),
        })
        .notification_handler::<OrderCreated, _>(|_| ConfirmationMailer)
        .notification_handler::<OrderCreated, _>(move |_| InventoryReserver {
            store: store.clone(),
        })
        .build()
}

/// Run the order scenario and print each result
pub async fn run(config: &Config) -> Result<(), MediatorError> {
    let store = OrderStore::default();
    let mediator = build_mediator(config, store);
    let cancel = CancellationToken::new();

    let id = mediator
        .send_with_response(
            CreateOrder {
                customer: "ada@example.com".to_string(),
                items: vec!["keyboard".to_string(), "mouse".to_string()],
            },
            &cancel,
        )
        .await?;
    println!("Created order {}", id.0);

    mediator
        .publish(
            OrderCreated {
                id: id.0.clone(),
                customer: "ada@example.com".to_string(),
            },
            &cancel,
        )
        .await?;

    let order = mediator.query(GetOrder { id: id.0.clone() }, &cancel).await?;
    match serde_json::to_string_pretty(&order) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!("Failed to render order: {}", e),
    }

    match mediator
        .query(GetOrder { id: "missing".to_string() }, &cancel)
        .await
    {
        Ok(order) => println!("Unexpected order: {}", order.id),
        Err(e) if e.downcast_fault_ref::<OrderNotFound>().is_some() => {
            println!("Lookup failed as expected: {}", e);
        }
        Err(e) => return Err(e),
    }

    mediator.send(CancelOrder { id: id.0.clone() }, &cancel).await?;
    let order = mediator.query(GetOrder { id: id.0 }, &cancel).await?;
    println!("Order {} is now {}", order.id, order.status);

    Ok(())
}
