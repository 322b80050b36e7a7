//! In-memory ticket store. The process owns all session state; restarting
//! the binary empties the facility.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::billing::{self, Fee, RateTable};
use crate::clock::Clock;
use crate::models::ticket::generate_qr_token;
use crate::models::{DeliveryState, PlateNumber, Ticket, TicketStatus, VehicleCategory};
use crate::utils::error::AppError;

/// One parking session. Settlement fields live behind their own lock and
/// the delivery state is a lone atomic, so exits and delivery resolution
/// never contend with each other or with the store index.
struct TicketRecord {
    id: Uuid,
    qr_token: String,
    plate_number: PlateNumber,
    vehicle_type: VehicleCategory,
    entry_timestamp: DateTime<Utc>,
    delivery: AtomicU8,
    settlement: Mutex<Settlement>,
}

struct Settlement {
    status: TicketStatus,
    exit_timestamp: Option<DateTime<Utc>>,
    calculated_fee: Option<Fee>,
}

impl TicketRecord {
    fn settlement(&self) -> MutexGuard<'_, Settlement> {
        self.settlement
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Ticket {
        let settlement = self.settlement();
        Ticket {
            id: self.id,
            qr_token: self.qr_token.clone(),
            plate_number: self.plate_number.clone(),
            vehicle_type: self.vehicle_type,
            entry_timestamp: self.entry_timestamp,
            exit_timestamp: settlement.exit_timestamp,
            calculated_fee: settlement.calculated_fee,
            status: settlement.status,
            delivery_state: DeliveryState::from_u8(self.delivery.load(Ordering::Acquire)),
        }
    }
}

#[derive(Default)]
struct Index {
    by_id: HashMap<Uuid, Arc<TicketRecord>>,
    by_token: HashMap<String, Uuid>,
    active_by_plate: HashMap<PlateNumber, Uuid>,
    insertion_order: Vec<Uuid>,
}

/// Result of a delivery transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTransition {
    /// This caller won the race and moved the state out of `Pending`.
    Applied(DeliveryState),
    /// The state was already exactly what the caller asked for.
    AlreadyInRequestedState(DeliveryState),
}

#[derive(Debug, Clone, Copy)]
pub struct DeliveryUpdate {
    pub ticket_id: Uuid,
    pub transition: DeliveryTransition,
}

#[derive(Debug, Clone)]
pub struct ExitSettlement {
    pub ticket: Ticket,
    pub total_minutes: u64,
    pub total_hours: u64,
    /// False when a settled session was scanned again; the stored fee is
    /// reported and nothing is re-billed.
    pub newly_settled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingStatus {
    pub active_vehicles: usize,
    pub vehicle_type_counts: BTreeMap<VehicleCategory, usize>,
    pub active_tickets: Vec<ActiveTicketSummary>,
    pub today_stats: TodayStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTicketSummary {
    pub id: Uuid,
    pub plate_number: PlateNumber,
    pub vehicle_type: VehicleCategory,
    pub entry_timestamp: DateTime<Utc>,
    pub time_elapsed: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStats {
    pub total_entries: usize,
    pub total_revenue: Fee,
}

pub struct TicketStore {
    clock: Arc<dyn Clock>,
    rates: RateTable,
    // Lock order: the index lock may briefly take a record's settlement
    // lock, never the reverse. Paths holding a settlement lock release it
    // before touching the index.
    index: Mutex<Index>,
}

impl TicketStore {
    pub fn new(clock: Arc<dyn Clock>, rates: RateTable) -> Self {
        Self {
            clock,
            rates,
            index: Mutex::new(Index::default()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    fn index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a session. Plate uniqueness among active sessions is checked
    /// under the same lock that performs the insert.
    pub fn create(
        &self,
        plate: PlateNumber,
        category: VehicleCategory,
    ) -> Result<Ticket, AppError> {
        let now = self.clock.now();
        let mut index = self.index();

        if let Some(existing_id) = index.active_by_plate.get(&plate).copied() {
            let still_active = index
                .by_id
                .get(&existing_id)
                .map(|record| record.settlement().status == TicketStatus::Active)
                .unwrap_or(false);
            if still_active {
                return Err(AppError::DuplicateActiveSession(plate.to_string()));
            }
            // Stale entry left by a settlement that has not cleaned up yet.
            index.active_by_plate.remove(&plate);
        }

        let id = Uuid::new_v4();
        let mut qr_token = generate_qr_token();
        while index.by_token.contains_key(&qr_token) {
            qr_token = generate_qr_token();
        }

        let record = Arc::new(TicketRecord {
            id,
            qr_token: qr_token.clone(),
            plate_number: plate.clone(),
            vehicle_type: category,
            entry_timestamp: now,
            delivery: AtomicU8::new(DeliveryState::Pending.as_u8()),
            settlement: Mutex::new(Settlement {
                status: TicketStatus::Active,
                exit_timestamp: None,
                calculated_fee: None,
            }),
        });

        let ticket = record.snapshot();
        index.by_token.insert(qr_token, id);
        index.active_by_plate.insert(plate, id);
        index.insertion_order.push(id);
        index.by_id.insert(id, record);

        info!(
            ticket_id = %id,
            plate = %ticket.plate_number,
            category = ?category,
            "Vehicle entry registered"
        );
        Ok(ticket)
    }

    fn record_by_id(&self, id: Uuid) -> Result<Arc<TicketRecord>, AppError> {
        self.index()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(AppError::TicketNotFound)
    }

    fn record_by_token(&self, token: &str) -> Result<Arc<TicketRecord>, AppError> {
        let index = self.index();
        let id = index.by_token.get(token).ok_or(AppError::TicketNotFound)?;
        index.by_id.get(id).cloned().ok_or(AppError::TicketNotFound)
    }

    pub fn lookup_by_id(&self, id: Uuid) -> Result<Ticket, AppError> {
        Ok(self.record_by_id(id)?.snapshot())
    }

    pub fn lookup_by_token(&self, token: &str) -> Result<Ticket, AppError> {
        Ok(self.record_by_token(token)?.snapshot())
    }

    /// All tickets in insertion order, including settled and cancelled ones.
    pub fn list_all(&self) -> Vec<Ticket> {
        let records: Vec<Arc<TicketRecord>> = {
            let index = self.index();
            index
                .insertion_order
                .iter()
                .filter_map(|id| index.by_id.get(id).cloned())
                .collect()
        };
        records.iter().map(|record| record.snapshot()).collect()
    }

    /// Settles an active session at the current time. A second scan of a
    /// settled session replays the stored outcome instead of re-billing.
    /// A failed fee calculation leaves the session active and unbilled.
    pub fn complete_exit(&self, token: &str) -> Result<ExitSettlement, AppError> {
        let record = self.record_by_token(token)?;

        let (total_minutes, total_hours, newly_settled) = {
            let mut settlement = record.settlement();
            match settlement.status {
                TicketStatus::Active => {
                    let exit = self.clock.now();
                    let rate = self.rates.rate_for(record.vehicle_type);
                    let breakdown = billing::compute_fee(record.entry_timestamp, exit, rate)?;

                    settlement.status = TicketStatus::Completed;
                    settlement.exit_timestamp = Some(exit);
                    settlement.calculated_fee = Some(breakdown.fee);
                    (breakdown.minutes, breakdown.hours, true)
                }
                TicketStatus::Completed => {
                    let exit = settlement.exit_timestamp.unwrap_or(record.entry_timestamp);
                    let minutes = billing::billable_minutes(record.entry_timestamp, exit);
                    (minutes, billing::billable_hours(minutes), false)
                }
                TicketStatus::Cancelled => {
                    return Err(AppError::AlreadyCompleted(
                        "La sesión fue cancelada y no puede cerrarse".to_string(),
                    ));
                }
            }
        };

        if newly_settled {
            self.release_plate(&record.plate_number, record.id);
        }

        let ticket = record.snapshot();
        if newly_settled {
            info!(
                ticket_id = %ticket.id,
                plate = %ticket.plate_number,
                minutes = total_minutes,
                hours = total_hours,
                fee_cents = ticket.calculated_fee.map(Fee::cents).unwrap_or(0),
                "Session settled"
            );
        } else {
            info!(ticket_id = %ticket.id, "Exit scan replayed on settled session");
        }

        Ok(ExitSettlement {
            ticket,
            total_minutes,
            total_hours,
            newly_settled,
        })
    }

    /// Closes a session without billing it. Operator action for mistaken
    /// entries; the plate becomes available again.
    pub fn cancel(&self, id: Uuid) -> Result<Ticket, AppError> {
        let record = self.record_by_id(id)?;

        {
            let mut settlement = record.settlement();
            match settlement.status {
                TicketStatus::Active => settlement.status = TicketStatus::Cancelled,
                TicketStatus::Completed => {
                    return Err(AppError::AlreadyCompleted(
                        "La sesión ya fue cerrada y no puede cancelarse".to_string(),
                    ));
                }
                TicketStatus::Cancelled => {
                    return Err(AppError::AlreadyCompleted(
                        "La sesión ya estaba cancelada".to_string(),
                    ));
                }
            }
        }

        self.release_plate(&record.plate_number, record.id);
        warn!(ticket_id = %record.id, plate = %record.plate_number, "Session cancelled by operator");
        Ok(record.snapshot())
    }

    /// Resolves the delivery state with a single compare-and-swap. Only
    /// `Pending -> terminal` can succeed; asking for the state the ticket
    /// already holds is reported as such so callers can stay idempotent.
    pub fn transition_delivery(
        &self,
        token: &str,
        target: DeliveryState,
    ) -> Result<DeliveryUpdate, AppError> {
        debug_assert!(target.is_terminal());
        let record = self.record_by_token(token)?;

        let transition = match record.delivery.compare_exchange(
            DeliveryState::Pending.as_u8(),
            target.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                info!(ticket_id = %record.id, state = ?target, "Delivery resolved");
                DeliveryTransition::Applied(target)
            }
            Err(current) => {
                let current = DeliveryState::from_u8(current);
                if current == target {
                    DeliveryTransition::AlreadyInRequestedState(current)
                } else {
                    return Err(AppError::AlreadyDelivered { current });
                }
            }
        };

        Ok(DeliveryUpdate {
            ticket_id: record.id,
            transition,
        })
    }

    /// Dashboard aggregate over every record, computed on demand.
    pub fn status_snapshot(&self) -> ParkingStatus {
        let now = self.clock.now();
        let today_start = start_of_local_day(now);

        let records: Vec<Arc<TicketRecord>> = {
            let index = self.index();
            index
                .insertion_order
                .iter()
                .filter_map(|id| index.by_id.get(id).cloned())
                .collect()
        };

        let mut vehicle_type_counts: BTreeMap<VehicleCategory, usize> =
            VehicleCategory::ALL.iter().map(|c| (*c, 0)).collect();
        let mut active_tickets = Vec::new();
        let mut total_entries = 0;
        let mut total_revenue = Fee::ZERO;

        for record in records {
            let (status, exit_timestamp, calculated_fee) = {
                let settlement = record.settlement();
                (
                    settlement.status,
                    settlement.exit_timestamp,
                    settlement.calculated_fee,
                )
            };

            if record.entry_timestamp >= today_start {
                total_entries += 1;
            }

            match status {
                TicketStatus::Active => {
                    *vehicle_type_counts.entry(record.vehicle_type).or_insert(0) += 1;
                    active_tickets.push(ActiveTicketSummary {
                        id: record.id,
                        plate_number: record.plate_number.clone(),
                        vehicle_type: record.vehicle_type,
                        entry_timestamp: record.entry_timestamp,
                        time_elapsed: billing::elapsed_minutes(record.entry_timestamp, now),
                    });
                }
                TicketStatus::Completed => {
                    if let (Some(exit), Some(fee)) = (exit_timestamp, calculated_fee) {
                        if exit >= today_start {
                            total_revenue = total_revenue.saturating_add(fee);
                        }
                    }
                }
                TicketStatus::Cancelled => {}
            }
        }

        ParkingStatus {
            active_vehicles: active_tickets.len(),
            vehicle_type_counts,
            active_tickets,
            today_stats: TodayStats {
                total_entries,
                total_revenue,
            },
        }
    }

    /// Frees a plate for re-entry, but only if it still maps to the given
    /// session. A newer session for the same plate is left alone.
    fn release_plate(&self, plate: &PlateNumber, id: Uuid) {
        let mut index = self.index();
        if index.active_by_plate.get(plate) == Some(&id) {
            index.active_by_plate.remove(plate);
        }
    }
}

/// Start of the current calendar day in facility local time, expressed in
/// UTC. Falls back to the UTC day boundary when local midnight does not
/// exist (DST transition at 00:00).
fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let local_midnight = now.with_timezone(&Local).date_naive().and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&local_midnight)
        .earliest()
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN)))
}
