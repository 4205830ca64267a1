//! Shared application state handed to every handler.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::TallyConfig;
use crate::scheduler::ReportRunner;
use tally_core::classifier::{KeywordClassifier, PaymentClassifier};
use tally_core::{BusinessClock, CoreResult, NewSale, SaleEvent};
use tally_db::{AggregationEngine, Database, DbResult};

/// Sales buffered for slow websocket subscribers before they start lagging.
const FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub clock: BusinessClock,
    pub runner: ReportRunner,
    pub classifier: Arc<dyn PaymentClassifier>,
    pub config: Arc<TallyConfig>,
    feed: broadcast::Sender<SaleEvent>,
}

impl AppState {
    /// State with the default keyword classifier.
    pub fn new(db: Database, clock: BusinessClock, config: TallyConfig) -> CoreResult<Self> {
        let classifier = Arc::new(KeywordClassifier::new()?);
        Ok(Self::with_classifier(db, clock, config, classifier))
    }

    pub fn with_classifier(
        db: Database,
        clock: BusinessClock,
        config: TallyConfig,
        classifier: Arc<dyn PaymentClassifier>,
    ) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        AppState {
            runner: ReportRunner::new(db.clone(), clock.clone()),
            db,
            clock,
            classifier,
            config: Arc::new(config),
            feed,
        }
    }

    pub fn aggregation(&self) -> AggregationEngine {
        self.db.aggregation(self.clock.clone())
    }

    /// Stores a sale and announces it on the live feed.
    pub async fn ingest(&self, sale: NewSale) -> DbResult<SaleEvent> {
        let event = self.db.ingest_sale(sale).await?;
        // No subscribers is fine
        let _ = self.feed.send(event.clone());
        Ok(event)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaleEvent> {
        self.feed.subscribe()
    }
}
