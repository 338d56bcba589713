mod common;

use std::sync::Arc;

use apartment_billing_api::{
    dto::cart::AddProductRequest,
    error::AppError,
    models::PaymentStatus,
    services::{bill_service, cart_service},
    store::{BillStore, CartStore, MemoryStore, PageRequest},
};
use uuid::Uuid;

const DUE_DAYS: i64 = 30;

async fn fill_cart(store: &MemoryStore, resident_id: Uuid) -> anyhow::Result<(Uuid, Uuid)> {
    let rent = common::product(store, "Rent", 10_000).await?;
    let cleaning = common::product(store, "Cleaning", 5_000).await?;
    let cart = store.ensure_cart(resident_id).await?;
    store.add_to_line(cart.id, rent.id, 2).await?;
    store.add_to_line(cart.id, cleaning.id, 1).await?;
    Ok((cart.id, cleaning.id))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_conversions_create_one_bill() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let resident = common::resident();
    let (cart_id, _) = fill_cart(&store, resident.user_id).await?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let resident = resident.clone();
            tokio::spawn(async move {
                bill_service::create_from_cart(store.as_ref(), &resident, cart_id, DUE_DAYS).await
            })
        })
        .collect();

    let mut created = Vec::new();
    for handle in handles {
        match handle.await? {
            Ok(response) => created.push(response.into_data().expect("bill")),
            Err(AppError::Validation(_) | AppError::Conflict(_)) => {}
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].amount, 25_000);
    assert_eq!(created[0].lines.len(), 2);
    assert!(store.cart_lines(cart_id).await?.is_empty());

    let (bills, total) = store
        .list_bills(None, PageRequest { limit: 10, offset: 0 })
        .await?;
    assert_eq!(total, 1);
    let stored = store.find_bill(bills[0].id).await?.expect("bill");
    assert_eq!(stored.lines.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn add_racing_a_conversion_is_billed_or_kept() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let resident = common::resident();
    let (cart_id, cleaning) = fill_cart(&store, resident.user_id).await?;
    let extra = common::product(&store, "Parking", 7_000).await?;

    let convert = {
        let store = Arc::clone(&store);
        let resident = resident.clone();
        tokio::spawn(async move {
            bill_service::create_from_cart(store.as_ref(), &resident, cart_id, DUE_DAYS).await
        })
    };
    let add = {
        let store = Arc::clone(&store);
        let resident = resident.clone();
        tokio::spawn(async move {
            cart_service::add_product(
                store.as_ref(),
                &resident,
                AddProductRequest {
                    product_id: extra.id,
                    quantity: 1,
                },
            )
            .await
        })
    };
    let (converted, added) = tokio::join!(convert, add);
    let created = converted??.into_data().expect("bill");
    added??;

    let (_, total) = store
        .list_bills(None, PageRequest { limit: 10, offset: 0 })
        .await?;
    assert_eq!(total, 1);

    // Every line ends up in exactly one place.
    let remaining = store.cart_lines(cart_id).await?;
    assert_eq!(created.lines.len() + remaining.len(), 3);
    let billed: i64 = created
        .lines
        .iter()
        .map(|l| l.price * i64::from(l.quantity))
        .sum();
    assert_eq!(created.amount, billed);
    assert!(created.lines.iter().any(|l| l.product_id == cleaning));
    let parking_billed = created.lines.iter().any(|l| l.product_id == extra.id);
    let parking_kept = remaining.iter().any(|l| l.product.id == extra.id);
    assert!(parking_billed ^ parking_kept);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_record_once() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let resident = common::resident();
    let (cart_id, _) = fill_cart(&store, resident.user_id).await?;
    let bill_id = bill_service::create_from_cart(store.as_ref(), &resident, cart_id, DUE_DAYS)
        .await?
        .into_data()
        .expect("bill")
        .id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let resident = resident.clone();
            tokio::spawn(async move { bill_service::mark_paid(store.as_ref(), &resident, bill_id).await })
        })
        .collect();

    let mut recorded = 0;
    let mut paid_at = Vec::new();
    for handle in handles {
        let response = handle.await??;
        if response.message == "Payment recorded" {
            recorded += 1;
        }
        let bill = response.into_data().expect("bill");
        assert_eq!(bill.bill.payment_status, PaymentStatus::Paid);
        paid_at.push(bill.bill.paid_at);
    }

    assert_eq!(recorded, 1);
    assert!(paid_at[0].is_some());
    assert!(paid_at.iter().all(|at| *at == paid_at[0]));
    let payments = store
        .audit_actions()
        .into_iter()
        .filter(|action| action == "bill_paid")
        .count();
    assert_eq!(payments, 1);
    Ok(())
}
