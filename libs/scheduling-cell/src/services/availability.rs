// libs/scheduling-cell/src/services/availability.rs
use chrono::NaiveDate;
use reqwest::Method;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use notification_cell::services::consumer::{format_date_ar, format_date_en, format_date_fr};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::LocalizedText;

use crate::models::{Appointment, DayAvailability, SchedulingError, TimeSlot};

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Free slots for one doctor on one day: the fixed catalog minus every
    /// slot held by a non-cancelled appointment. Cancelled bookings release
    /// their slot immediately.
    pub async fn check_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DayAvailability, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&status=neq.cancelled",
            doctor_id, date
        );
        let reserved: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let taken: HashSet<TimeSlot> = reserved.iter().map(|a| a.time_slot).collect();
        let available_slots: Vec<TimeSlot> = TimeSlot::DAILY_CATALOG
            .iter()
            .copied()
            .filter(|slot| !taken.contains(slot))
            .collect();

        debug!(
            "Doctor {} on {}: {} of {} slots free",
            doctor_id,
            date,
            available_slots.len(),
            TimeSlot::DAILY_CATALOG.len()
        );

        let message = availability_message(date, available_slots.len());

        Ok(DayAvailability {
            date,
            total_slots: TimeSlot::DAILY_CATALOG.len(),
            reserved_count: taken.len(),
            available_count: available_slots.len(),
            available_slots,
            message,
        })
    }
}

fn availability_message(date: NaiveDate, available: usize) -> LocalizedText {
    if available == 0 {
        LocalizedText::trilingual(
            format!("Aucun créneau disponible le {}", format_date_fr(date)),
            format!("No slots available on {}", format_date_en(date)),
            format!("لا توجد مواعيد متاحة في {}", format_date_ar(date)),
        )
    } else {
        LocalizedText::trilingual(
            format!(
                "{} créneau(x) disponible(s) le {}",
                available,
                format_date_fr(date)
            ),
            format!("{} slot(s) available on {}", available, format_date_en(date)),
            format!("{} موعدًا متاحًا في {}", available, format_date_ar(date)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_day_message_switches_to_none_available() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        let some = availability_message(date, 3);
        assert!(some.fr.as_deref().unwrap_or_default().starts_with("3 créneau"));

        let none = availability_message(date, 0);
        assert!(none.fr.as_deref().unwrap_or_default().starts_with("Aucun"));
        assert!(none.en.as_deref().unwrap_or_default().starts_with("No slots"));
    }
}
