use std::time::Duration;

use tracing::{error, info, Instrument};

use smart_market::app_system::{setup_tracing, AppConfig, ShoppingSystem};
use smart_market::presenter::{
    product_line, summary_lines, ListPresenter, ListState, PendingDelete, SaveOutcome,
};

const STATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Waits until the list screen reaches a state matching `condition`.
async fn wait_for_list(
    presenter: &ListPresenter,
    condition: impl FnMut(&ListState) -> bool,
) -> Result<ListState, String> {
    let mut receiver = presenter.watch();
    let state = tokio::time::timeout(STATE_TIMEOUT, receiver.wait_for(condition))
        .await
        .map_err(|_| "Timed out waiting for the list".to_string())?
        .map_err(|e| e.to_string())?;
    Ok(ListState::clone(&state))
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    info!(collection = %config.collection, "Starting shopping list");

    let system = ShoppingSystem::new(&config);
    let mut presenter = ListPresenter::mount(system.gateway.clone())
        .await
        .map_err(|e| e.to_string())?;
    wait_for_list(&presenter, |s| !s.loading).await?;

    let span = tracing::info_span!("add_product");
    let id = async {
        presenter.open_add();
        let form = presenter.form_mut();
        form.set_name("Arroz");
        form.set_quantity("2");
        form.set_unit_price("5.50");
        match presenter.save().await {
            Ok(SaveOutcome::Created(id)) => Ok(id),
            Ok(outcome) => Err(format!("Unexpected save outcome: {outcome:?}")),
            Err(notice) => Err(notice.to_string()),
        }
    }
    .instrument(span)
    .await?;
    info!(product_id = %id, "Product added");

    wait_for_list(&presenter, |s| s.find(&id).is_some()).await?;
    if let Err(notice) = presenter.toggle_purchased(&id).await {
        error!(%notice, "Could not mark product");
    }

    let state = wait_for_list(&presenter, |s| s.summary.purchased_count > 0).await?;
    for product in &state.products {
        info!("{}", product_line(product));
    }
    for (label, value) in summary_lines(&state.summary) {
        info!("{label}: {value}");
    }

    let pending = presenter.request_delete(id);
    info!(prompt = PendingDelete::MESSAGE, "Deleting after confirmation");
    if let Err(notice) = presenter.delete(pending).await {
        error!(%notice, "Could not delete product");
    }
    wait_for_list(&presenter, |s| s.is_empty()).await?;

    presenter.unmount();
    system.shutdown().await?;

    info!("Shopping list closed");
    Ok(())
}
