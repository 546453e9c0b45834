//! Paper-trading adapters for the boundary traits.
//!
//! `FileFeed` replays a JSONL tick capture, `PaperRouter` fills at the last
//! replayed mark, and `SimReference` derives instrument metadata from the
//! engine's own symbol format. No vendor connection anywhere; a missing mark
//! is a rejection or a gap, never a synthetic price.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use strike_core::{
    BatchOrderRequest, FillReport, FillStatus, InstrumentMeta, MarketFeed, OptionQuote,
    OptionRight, OrderRequest, OrderRouter, ReferenceData, Tick,
};
use tracing::warn;
use uuid::Uuid;

/// Last traded price per instrument, shared between the feed and the paper
/// router so fills happen at the most recent replayed mark.
pub type MarkStore = Arc<Mutex<HashMap<String, Decimal>>>;

#[must_use]
pub fn mark_store() -> MarkStore {
    Arc::new(Mutex::new(HashMap::new()))
}

/// Replays a JSONL file of `Tick` records in file order.
///
/// Only ticks for subscribed instruments are forwarded, so the ATM-window
/// subscription logic is exercised exactly as it would be live. Once the
/// file is exhausted the stream goes quiet until the operator stops the run.
pub struct FileFeed {
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    subscribed: BTreeSet<String>,
    marks: MarkStore,
    exhausted: bool,
}

impl FileFeed {
    pub fn open(path: impl AsRef<Path>, marks: MarkStore) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("tick capture not found: {}", path.display()))?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            subscribed: BTreeSet::new(),
            marks: Arc::clone(&marks),
            exhausted: false,
        })
    }
}

#[async_trait]
impl MarketFeed for FileFeed {
    async fn next_tick(&mut self) -> Result<Option<Tick>> {
        loop {
            if self.exhausted {
                warn!(path = %self.path.display(), "tick capture exhausted; stream idle");
                // Hold the stream open so positions stay monitored and the
                // operator decides when the run ends.
                std::future::pending::<()>().await;
            }
            let Some(line) = self.lines.next() else {
                self.exhausted = true;
                continue;
            };
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let tick: Tick = match serde_json::from_str(&line) {
                Ok(tick) => tick,
                Err(e) => {
                    warn!(error = %e, "malformed tick line skipped");
                    continue;
                }
            };
            if let Ok(mut marks) = self.marks.lock() {
                marks.insert(tick.instrument.clone(), tick.price);
            }
            if self.subscribed.contains(&tick.instrument) {
                return Ok(Some(tick));
            }
        }
    }

    async fn subscribe(&mut self, instruments: &[String]) -> Result<()> {
        self.subscribed.extend(instruments.iter().cloned());
        Ok(())
    }

    async fn unsubscribe(&mut self, instruments: &[String]) -> Result<()> {
        for instrument in instruments {
            self.subscribed.remove(instrument);
        }
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        // A file never drops; nothing to re-establish.
        Ok(())
    }
}

/// Fills every order at the last replayed mark; no mark means a rejection.
pub struct PaperRouter {
    marks: MarkStore,
}

impl PaperRouter {
    #[must_use]
    pub fn new(marks: MarkStore) -> Self {
        Self { marks }
    }

    fn mark(&self, instrument: &str) -> Option<Decimal> {
        self.marks.lock().ok()?.get(instrument).copied()
    }
}

#[async_trait]
impl OrderRouter for PaperRouter {
    async fn place_order(&self, request: &OrderRequest) -> Result<FillReport> {
        let (status, fill_price) = match self.mark(&request.instrument) {
            Some(mark) => (FillStatus::Filled, mark),
            None => {
                warn!(instrument = %request.instrument, "no mark; paper order rejected");
                (FillStatus::Rejected, Decimal::ZERO)
            }
        };
        Ok(FillReport {
            correlation_id: request.correlation_id.clone(),
            order_id: Uuid::new_v4().to_string(),
            status,
            fill_price,
            filled_quantity: match status {
                FillStatus::Filled => request.quantity,
                FillStatus::Rejected => 0,
            },
            timestamp: Utc::now(),
        })
    }

    async fn place_batch(&self, batch: &BatchOrderRequest) -> Result<Vec<FillReport>> {
        let mut reports = Vec::with_capacity(batch.orders.len());
        for order in &batch.orders {
            reports.push(self.place_order(order).await?);
        }
        Ok(reports)
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Reference data derived from the `UNDERLYING-YYYYMMDD-STRIKE-RIGHT` symbol
/// format, with weekly (Thursday) expiries.
pub struct SimReference {
    lot_size: u32,
    marks: MarkStore,
}

impl SimReference {
    #[must_use]
    pub fn new(lot_size: u32, marks: MarkStore) -> Self {
        Self { lot_size, marks }
    }
}

#[async_trait]
impl ReferenceData for SimReference {
    async fn instrument_meta(&self, instrument: &str) -> Result<InstrumentMeta> {
        let parts: Vec<&str> = instrument.split('-').collect();
        anyhow::ensure!(parts.len() == 4, "unrecognized option symbol: {instrument}");
        let expiry = NaiveDate::parse_from_str(parts[1], "%Y%m%d")
            .with_context(|| format!("bad expiry in symbol: {instrument}"))?;
        let strike: Decimal = parts[2]
            .parse()
            .with_context(|| format!("bad strike in symbol: {instrument}"))?;
        let right = match parts[3] {
            "CE" => OptionRight::Call,
            "PE" => OptionRight::Put,
            other => anyhow::bail!("bad right in symbol: {other}"),
        };
        Ok(InstrumentMeta {
            instrument: instrument.to_string(),
            strike,
            right,
            expiry,
            lot_size: self.lot_size,
        })
    }

    async fn nearest_expiry(&self, from: NaiveDate) -> Result<NaiveDate> {
        let mut date = from;
        while date.weekday() != Weekday::Thu {
            date = date.succ_opt().context("date overflow")?;
        }
        Ok(date)
    }

    async fn poll_quote(&self, instrument: &str) -> Result<OptionQuote> {
        let mark = self
            .marks
            .lock()
            .ok()
            .and_then(|m| m.get(instrument).copied())
            .with_context(|| format!("no replayed mark for {instrument}"))?;
        let meta = self.instrument_meta(instrument).await?;
        Ok(OptionQuote {
            instrument: meta.instrument,
            strike: meta.strike,
            right: meta.right,
            expiry: meta.expiry,
            last_price: mark,
            open_interest: Decimal::ZERO,
            volume: Decimal::ZERO,
            bid_price: None,
            bid_qty: None,
            ask_price: None,
            ask_qty: None,
            greeks: None,
            updated_at: Utc::now(),
        })
    }
}
