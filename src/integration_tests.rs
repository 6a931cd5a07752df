#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::aggregator::ListSummary;
    use crate::app_system::{AppConfig, ShoppingSystem};
    use crate::domain::{Product, ProductDraft};
    use crate::gateway::{PersistenceError, ProductSubscription, SubscriptionError};
    use crate::presenter::{FormMode, ListPresenter, ListState, Operation, SaveOutcome};
    use crate::store::{Access, DocumentStore};
    use crate::validation::FormField;

    const WAIT: Duration = Duration::from_secs(2);

    /// System whose store hands out `product_N` ids and whose clock moves one
    /// second per reading.
    fn start_system() -> ShoppingSystem {
        let config = AppConfig::default();
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("product_{}", counter.fetch_add(1, Ordering::SeqCst));
        let ticks = Arc::new(AtomicI64::new(0));
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let clock = move || start + chrono::Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst));

        let (store, client) = DocumentStore::new(config.buffer_size, next_id, clock);
        ShoppingSystem::with_store(&config, store, client)
    }

    async fn next(subscription: &mut ProductSubscription) -> Vec<Product> {
        tokio::time::timeout(WAIT, subscription.next_snapshot())
            .await
            .expect("Timed out waiting for snapshot")
            .expect("Subscription ended")
    }

    async fn wait_for_state(
        presenter: &ListPresenter,
        condition: impl FnMut(&ListState) -> bool,
    ) -> ListState {
        let mut receiver = presenter.watch();
        let state = tokio::time::timeout(WAIT, receiver.wait_for(condition))
            .await
            .expect("Timed out waiting for list state")
            .expect("Presenter dropped");
        ListState::clone(&state)
    }

    #[tokio::test]
    async fn test_create_shows_up_in_next_snapshot() {
        let system = start_system();
        let mut subscription = system.gateway.subscribe().await.unwrap();
        assert!(next(&mut subscription).await.is_empty());

        let id = system
            .gateway
            .create(ProductDraft::new("Arroz", 2.0, 5.5))
            .await
            .unwrap();

        let items = next(&mut subscription).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].name, "Arroz");
        assert_eq!(items[0].line_total(), 11.0);
        assert!(!items[0].purchased);

        subscription.unsubscribe().await;
        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_purchased_raises_purchased_value() {
        let system = start_system();
        let mut subscription = system.gateway.subscribe().await.unwrap();
        next(&mut subscription).await;

        let arroz = system.gateway.create(ProductDraft::new("Arroz", 2.0, 5.5)).await.unwrap();
        next(&mut subscription).await;
        system.gateway.create(ProductDraft::new("Leite", 6.0, 4.0)).await.unwrap();
        let before = ListSummary::from_products(&next(&mut subscription).await);

        system.gateway.set_purchased(&arroz, true).await.unwrap();
        let items = next(&mut subscription).await;
        let after = ListSummary::from_products(&items);

        let toggled = items.iter().find(|p| p.id == arroz).unwrap();
        assert!(toggled.purchased);
        assert!((after.purchased_value - before.purchased_value - toggled.line_total()).abs() < 1e-9);
        assert_eq!(after.purchased_count, 1);
        assert_eq!(after.total_count, before.total_count);

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let system = start_system();
        let mut subscription = system.gateway.subscribe().await.unwrap();
        next(&mut subscription).await;

        let a = system.gateway.create(ProductDraft::new("A", 1.0, 1.0)).await.unwrap();
        next(&mut subscription).await;
        system.gateway.create(ProductDraft::new("B", 1.0, 1.0)).await.unwrap();
        let before = next(&mut subscription).await;

        system.gateway.delete(&a).await.unwrap();
        let after = next(&mut subscription).await;

        assert_eq!(after.len(), before.len() - 1);
        assert!(after.iter().all(|p| p.id != a));

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_newest_product_comes_first() {
        let system = start_system();
        for name in ["A", "B", "C"] {
            system.gateway.create(ProductDraft::new(name, 1.0, 1.0)).await.unwrap();
        }

        let mut subscription = system.gateway.subscribe().await.unwrap();
        let names: Vec<String> = next(&mut subscription).await.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["C", "B", "A"]);

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_edit_replaces_fields_and_keeps_position() {
        let system = start_system();
        let a = system.gateway.create(ProductDraft::new("A", 1.0, 1.0)).await.unwrap();
        system.gateway.create(ProductDraft::new("B", 1.0, 1.0)).await.unwrap();

        let mut subscription = system.gateway.subscribe().await.unwrap();
        next(&mut subscription).await;

        system
            .gateway
            .update(&a, ProductDraft::new("A2", 3.0, 2.5).into())
            .await
            .unwrap();
        let items = next(&mut subscription).await;
        assert_eq!(items[1].id, a);
        assert_eq!(items[1].name, "A2");
        assert_eq!(items[1].line_total(), 7.5);

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let system = start_system();

        let result = system.gateway.set_purchased("ghost", true).await;
        assert_eq!(result, Err(PersistenceError::NotFound("ghost".into())));
        assert_eq!(system.gateway.delete("ghost").await, Ok(()));

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let system = start_system();
        let mut first = system.gateway.subscribe().await.unwrap();
        let mut second = system.gateway.subscribe().await.unwrap();
        next(&mut first).await;
        next(&mut second).await;

        first.unsubscribe().await;
        first.unsubscribe().await;
        system.gateway.create(ProductDraft::new("A", 1.0, 1.0)).await.unwrap();

        assert_eq!(next(&mut second).await.len(), 1);
        assert!(first.next_snapshot().await.is_none());
        assert!(first.last_error().is_none());

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_revoked_access_ends_subscription() {
        let system = start_system();
        let mut subscription = system.gateway.subscribe().await.unwrap();
        next(&mut subscription).await;

        system
            .store
            .set_access(system.gateway.collection().to_string(), Access::Denied)
            .await
            .unwrap();

        let ended = tokio::time::timeout(WAIT, subscription.next_snapshot()).await.unwrap();
        assert!(ended.is_none());
        assert_eq!(
            subscription.last_error(),
            Some(&SubscriptionError::Revoked("produtos".into()))
        );

        let result = system.gateway.create(ProductDraft::new("A", 1.0, 1.0)).await;
        assert_eq!(result, Err(PersistenceError::PermissionDenied("produtos".into())));

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_open_subscriptions() {
        let system = start_system();
        let mut subscription = system.gateway.subscribe().await.unwrap();
        next(&mut subscription).await;

        system.shutdown().await.unwrap();
        assert!(subscription.next_snapshot().await.is_none());
        assert_eq!(subscription.last_error(), Some(&SubscriptionError::Closed));
    }

    #[tokio::test]
    async fn test_presenter_shopping_flow() {
        let system = start_system();
        let mut presenter = ListPresenter::mount(system.gateway.clone()).await.unwrap();

        let state = wait_for_state(&presenter, |s| !s.loading).await;
        assert!(state.is_empty());
        assert_eq!(state.summary, ListSummary::default());

        // Add
        presenter.open_add();
        presenter.form_mut().set_name(" Arroz ");
        presenter.form_mut().set_quantity("2");
        presenter.form_mut().set_unit_price("5.50");
        let outcome = presenter.save().await.unwrap();
        let SaveOutcome::Created(id) = outcome else {
            panic!("Unexpected outcome: {outcome:?}");
        };
        assert!(!presenter.form().is_open());

        let state = wait_for_state(&presenter, |s| s.products.len() == 1).await;
        assert_eq!(state.products[0].name, "Arroz");
        assert_eq!(state.summary.total_value, 11.0);
        assert_eq!(state.summary.remaining_value, 11.0);

        // Toggle
        presenter.toggle_purchased(&id).await.unwrap();
        let state = wait_for_state(&presenter, |s| s.summary.purchased_count == 1).await;
        assert_eq!(state.summary.purchased_value, 11.0);
        assert_eq!(state.summary.remaining_value, 0.0);

        // Edit
        assert!(presenter.open_edit(&id));
        assert_eq!(presenter.form().mode(), &FormMode::Edit { id: id.clone() });
        assert_eq!(presenter.form().input().quantity, "2");
        presenter.form_mut().set_quantity("3");
        assert_eq!(presenter.save().await.unwrap(), SaveOutcome::Updated(id.clone()));
        let state = wait_for_state(&presenter, |s| s.summary.total_value == 16.5).await;
        assert!(state.products[0].purchased);

        // Delete after confirmation
        let pending = presenter.request_delete(id.clone());
        assert_eq!(pending.id(), id);
        presenter.delete(pending).await.unwrap();
        let state = wait_for_state(&presenter, |s| s.is_empty()).await;
        assert_eq!(state.summary.total_count, 0);

        presenter.unmount();
        presenter.unmount();
        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_presenter_rejects_invalid_form_without_writing() {
        let system = start_system();
        let mut presenter = ListPresenter::mount(system.gateway.clone()).await.unwrap();
        wait_for_state(&presenter, |s| !s.loading).await;

        presenter.open_add();
        presenter.form_mut().set_name("   ");
        presenter.form_mut().set_quantity("abc");
        presenter.form_mut().set_unit_price("5.50");
        assert_eq!(presenter.save().await.unwrap(), SaveOutcome::Invalid);
        assert!(presenter.form().is_open());
        assert!(presenter.form().error(FormField::Name).is_some());
        assert!(presenter.form().error(FormField::Quantity).is_some());
        assert!(presenter.form().error(FormField::UnitPrice).is_none());

        // A write issued now is the first one the store sees.
        let id = system.gateway.create(ProductDraft::new("A", 1.0, 1.0)).await.unwrap();
        assert_eq!(id, "product_1");

        presenter.unmount();
        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_presenter_reports_failed_writes_as_notices() {
        let system = start_system();
        let mut presenter = ListPresenter::mount(system.gateway.clone()).await.unwrap();
        wait_for_state(&presenter, |s| !s.loading).await;

        let id = system.gateway.create(ProductDraft::new("A", 1.0, 1.0)).await.unwrap();
        wait_for_state(&presenter, |s| s.products.len() == 1).await;

        system
            .store
            .set_access("produtos".to_string(), Access::ReadOnly)
            .await
            .unwrap();

        presenter.open_add();
        presenter.form_mut().set_name("B");
        presenter.form_mut().set_quantity("1");
        presenter.form_mut().set_unit_price("1");
        let notice = presenter.save().await.unwrap_err();
        assert_eq!(notice.operation, Operation::Add);
        assert!(presenter.form().is_open());

        let notice = presenter.toggle_purchased(&id).await.unwrap_err();
        assert_eq!(notice.operation, Operation::Update);

        let pending = presenter.request_delete(id.clone());
        let notice = presenter.delete(pending).await.unwrap_err();
        assert_eq!(notice.operation, Operation::Delete);

        assert!(presenter.open_edit(&id));
        let notice = presenter.save().await.unwrap_err();
        assert_eq!(notice.operation, Operation::Edit);

        let notice = presenter.toggle_purchased("not-listed").await.unwrap_err();
        assert_eq!(notice.operation, Operation::Update);

        presenter.unmount();
        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_presenter_keeps_last_list_when_sync_fails() {
        let system = start_system();
        system.gateway.create(ProductDraft::new("A", 2.0, 3.0)).await.unwrap();

        let presenter = ListPresenter::mount(system.gateway.clone()).await.unwrap();
        wait_for_state(&presenter, |s| s.products.len() == 1).await;

        system
            .store
            .set_access("produtos".to_string(), Access::Denied)
            .await
            .unwrap();

        let state = wait_for_state(&presenter, |s| s.sync_error.is_some()).await;
        assert_eq!(state.sync_error, Some(SubscriptionError::Revoked("produtos".into())));
        assert_eq!(state.products.len(), 1);
        assert_eq!(state.summary.total_value, 6.0);

        tokio::time::timeout(WAIT, async {
            while presenter.is_mounted() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        system.shutdown().await.unwrap();
    }
}
