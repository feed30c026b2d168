// libs/notification-cell/src/services/consumer.rs
use chrono::{Datelike, NaiveDate};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use shared_models::LocalizedText;

use crate::events::DomainEvent;
use crate::models::CreateNotification;
use crate::services::notification::NotificationService;

/// Consumes the outbound event queue and fans each event out as persisted +
/// pushed notifications to both parties. Runs for the lifetime of the server;
/// every failure is logged and swallowed so the queue keeps draining.
pub struct EventConsumer {
    notifications: NotificationService,
    service_token: String,
}

impl EventConsumer {
    pub fn new(notifications: NotificationService, service_token: String) -> Self {
        Self {
            notifications,
            service_token,
        }
    }

    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<DomainEvent>) {
        info!("Notification event consumer started");
        while let Some(event) = rx.recv().await {
            for (receiver_id, notification) in notifications_for(&event) {
                if let Err(e) = self
                    .notifications
                    .create_notification(receiver_id, notification, &self.service_token)
                    .await
                {
                    error!("Notification fan-out failed for user {}: {}", receiver_id, e);
                }
            }
        }
        info!("Notification event consumer stopped");
    }
}

/// Render the trilingual notifications an event produces, one per recipient.
pub fn notifications_for(event: &DomainEvent) -> Vec<(Uuid, CreateNotification)> {
    match event {
        DomainEvent::AppointmentCreated {
            doctor_id,
            patient_id,
            doctor_name,
            patient_name,
            date,
            time_slot,
            ..
        } => {
            let title = LocalizedText::trilingual("Nouveau rendez-vous", "New Appointment", "موعد جديد");
            let for_doctor = CreateNotification {
                title: title.clone(),
                message: LocalizedText::trilingual(
                    format!("Nouveau rendez-vous le {} avec {}", format_date_fr(*date), patient_name),
                    format!("New appointment on {} with {}", format_date_en(*date), patient_name),
                    format!("موعد جديد في {} مع {}", format_date_ar(*date), patient_name),
                ),
                sender_id: Some(*patient_id),
                notification_type: Some("appointment_created".to_string()),
            };
            let for_patient = CreateNotification {
                title,
                message: LocalizedText::trilingual(
                    format!(
                        "Votre rendez-vous du {} à {} avec Dr. {} a été enregistré",
                        format_date_fr(*date),
                        time_slot,
                        doctor_name
                    ),
                    format!(
                        "Your appointment on {} at {} with Dr. {} has been registered",
                        format_date_en(*date),
                        time_slot,
                        doctor_name
                    ),
                    format!(
                        "تم تسجيل موعدك في {} الساعة {} مع د. {}",
                        format_date_ar(*date),
                        time_slot,
                        doctor_name
                    ),
                ),
                sender_id: Some(*doctor_id),
                notification_type: Some("appointment_created".to_string()),
            };
            vec![(*doctor_id, for_doctor), (*patient_id, for_patient)]
        }

        DomainEvent::AppointmentStatusChanged {
            doctor_id,
            patient_id,
            doctor_name,
            patient_first_name,
            date,
            new_status,
            ..
        } => {
            let (title, message) = status_content(new_status, *date);
            let for_doctor = CreateNotification {
                title: title.clone(),
                message: LocalizedText::trilingual(
                    format!("{} avec {}", message.fr.clone().unwrap_or_default(), patient_first_name),
                    format!("{} with {}", message.en.clone().unwrap_or_default(), patient_first_name),
                    format!("{} مع {}", message.ar.clone().unwrap_or_default(), patient_first_name),
                ),
                sender_id: Some(*patient_id),
                notification_type: Some("appointment_status".to_string()),
            };
            let for_patient = CreateNotification {
                title,
                message: LocalizedText::trilingual(
                    format!("{} avec Dr. {}", message.fr.clone().unwrap_or_default(), doctor_name),
                    format!("{} with Dr. {}", message.en.clone().unwrap_or_default(), doctor_name),
                    format!("{} مع د. {}", message.ar.clone().unwrap_or_default(), doctor_name),
                ),
                sender_id: Some(*doctor_id),
                notification_type: Some("appointment_status".to_string()),
            };
            vec![(*doctor_id, for_doctor), (*patient_id, for_patient)]
        }

        DomainEvent::AppointmentRescheduled {
            doctor_id,
            patient_id,
            doctor_name,
            patient_name,
            date,
            time_slot,
            ..
        } => {
            let title = LocalizedText::trilingual(
                "Modification de rendez-vous",
                "Appointment Modification",
                "تعديل الموعد",
            );
            let for_doctor = CreateNotification {
                title: title.clone(),
                message: LocalizedText::trilingual(
                    format!(
                        "Le rendez-vous avec {} a été modifié pour le {} à {}",
                        patient_name,
                        format_date_fr(*date),
                        time_slot
                    ),
                    format!(
                        "The appointment with {} has been moved to {} at {}",
                        patient_name,
                        format_date_en(*date),
                        time_slot
                    ),
                    format!(
                        "تم تعديل الموعد مع {} إلى {} في الساعة {}",
                        patient_name,
                        format_date_ar(*date),
                        time_slot
                    ),
                ),
                sender_id: Some(*patient_id),
                notification_type: Some("appointment_rescheduled".to_string()),
            };
            let for_patient = CreateNotification {
                title,
                message: LocalizedText::trilingual(
                    format!(
                        "Votre rendez-vous avec Dr. {} a été modifié pour le {} à {}",
                        doctor_name,
                        format_date_fr(*date),
                        time_slot
                    ),
                    format!(
                        "Your appointment with Dr. {} has been moved to {} at {}",
                        doctor_name,
                        format_date_en(*date),
                        time_slot
                    ),
                    format!(
                        "تم تعديل موعدك مع د. {} إلى {} في الساعة {}",
                        doctor_name,
                        format_date_ar(*date),
                        time_slot
                    ),
                ),
                sender_id: Some(*doctor_id),
                notification_type: Some("appointment_rescheduled".to_string()),
            };
            vec![(*doctor_id, for_doctor), (*patient_id, for_patient)]
        }
    }
}

fn status_content(new_status: &str, date: NaiveDate) -> (LocalizedText, LocalizedText) {
    match new_status {
        "confirmed" => (
            LocalizedText::trilingual("Rendez-vous confirmé", "Appointment Confirmed", "تم تأكيد الموعد"),
            LocalizedText::trilingual(
                format!("Votre rendez-vous du {} a été confirmé", format_date_fr(date)),
                format!("Your appointment on {} has been confirmed", format_date_en(date)),
                format!("تم تأكيد موعدك في {}", format_date_ar(date)),
            ),
        ),
        "cancelled" => (
            LocalizedText::trilingual("Rendez-vous annulé", "Appointment Cancelled", "تم إلغاء الموعد"),
            LocalizedText::trilingual(
                format!("Le rendez-vous du {} a été annulé", format_date_fr(date)),
                format!("The appointment on {} has been cancelled", format_date_en(date)),
                format!("تم إلغاء الموعد في {}", format_date_ar(date)),
            ),
        ),
        _ => (
            LocalizedText::trilingual("Mise à jour du rendez-vous", "Appointment Update", "تحديث الموعد"),
            LocalizedText::trilingual(
                format!("Le statut de votre rendez-vous du {} a été mis à jour", format_date_fr(date)),
                format!("The status of your appointment on {} has been updated", format_date_en(date)),
                format!("تم تحديث حالة موعدك في {}", format_date_ar(date)),
            ),
        ),
    }
}

// Long-form dates per language; chrono only ships English names.

const WEEKDAYS_FR: [&str; 7] = [
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
];
const MONTHS_FR: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin",
    "juillet", "août", "septembre", "octobre", "novembre", "décembre",
];
const MONTHS_AR: [&str; 12] = [
    "يناير", "فبراير", "مارس", "أبريل", "مايو", "يونيو",
    "يوليو", "أغسطس", "سبتمبر", "أكتوبر", "نوفمبر", "ديسمبر",
];

pub fn format_date_fr(date: NaiveDate) -> String {
    format!(
        "{} {} {} {}",
        WEEKDAYS_FR[date.weekday().num_days_from_monday() as usize],
        date.day(),
        MONTHS_FR[date.month0() as usize],
        date.year()
    )
}

pub fn format_date_en(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

pub fn format_date_ar(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_AR[date.month0() as usize],
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_date() -> NaiveDate {
        // A Monday.
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    #[test]
    fn french_date_is_long_form() {
        assert_eq!(format_date_fr(sample_date()), "lundi 9 mars 2026");
    }

    #[test]
    fn english_date_is_long_form() {
        assert_eq!(format_date_en(sample_date()), "Monday, March 9, 2026");
    }

    #[test]
    fn created_event_targets_both_parties() {
        let event = DomainEvent::AppointmentCreated {
            appointment_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_name: "Leila Haddad".to_string(),
            patient_name: "Amine Ben Salah".to_string(),
            date: sample_date(),
            time_slot: "09:00".to_string(),
        };

        let out = notifications_for(&event);
        assert_eq!(out.len(), 2);

        let (doctor_id, patient_id) = match &event {
            DomainEvent::AppointmentCreated { doctor_id, patient_id, .. } => (*doctor_id, *patient_id),
            _ => unreachable!(),
        };
        assert_eq!(out[0].0, doctor_id);
        assert_eq!(out[1].0, patient_id);

        let doctor_message = out[0].1.message.fr.as_deref().unwrap();
        assert!(doctor_message.contains("Amine Ben Salah"));
        assert!(doctor_message.contains("lundi 9 mars 2026"));

        let patient_message = out[1].1.message.en.as_deref().unwrap();
        assert!(patient_message.contains("Dr. Leila Haddad"));
        assert!(patient_message.contains("09:00"));
    }

    #[test]
    fn status_change_differentiates_confirmed_and_cancelled() {
        let base = |status: &str| DomainEvent::AppointmentStatusChanged {
            appointment_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_name: "Leila Haddad".to_string(),
            patient_first_name: "Amine".to_string(),
            date: sample_date(),
            new_status: status.to_string(),
        };

        let confirmed = notifications_for(&base("confirmed"));
        assert_eq!(confirmed[0].1.title.en.as_deref(), Some("Appointment Confirmed"));

        let cancelled = notifications_for(&base("cancelled"));
        assert_eq!(cancelled[0].1.title.en.as_deref(), Some("Appointment Cancelled"));

        // Anything outside the closed set falls back to the generic update.
        let other = notifications_for(&base("rebooked"));
        assert_eq!(other[0].1.title.en.as_deref(), Some("Appointment Update"));
    }
}
