//! Read views and reference data.

use serde::Serialize;

use super::{require_text, Portal, PortalError, PortalResult};
use crate::blockchain::LedgerInfo;
use crate::config::StoreBackend;
use crate::domain::*;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    pub blockchain: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStatus {
    pub version: &'static str,
    pub store: StoreBackend,
    pub health: HealthReport,
    pub ledger: Option<LedgerInfo>,
}

impl Portal {
    /// Database ping plus chain probe. Degraded when either is down.
    pub async fn health(&self) -> HealthReport {
        let database = match self.store.ping().await {
            Ok(()) => "up",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "down"
            }
        };
        let blockchain = match &self.ledger {
            None => "disabled",
            Some(ledger) if ledger.is_healthy().await => "up",
            Some(_) => "down",
        };
        let status = if database == "up" && blockchain != "down" {
            "ok"
        } else {
            "degraded"
        };
        HealthReport {
            status,
            database,
            blockchain,
        }
    }

    pub async fn status(&self) -> AdminStatus {
        AdminStatus {
            version: env!("CARGO_PKG_VERSION"),
            store: self.config.database.backend,
            health: self.health().await,
            ledger: self.ledger.as_ref().map(|ledger| ledger.info()),
        }
    }

    pub async fn user_profile(&self, user_id: i32) -> PortalResult<User> {
        self.require_user(user_id).await
    }

    /// Dashboard: the courses a user is registered for.
    pub async fn user_courses(&self, user_id: i32) -> PortalResult<Vec<RegisteredCourse>> {
        self.require_user(user_id).await?;
        Ok(self.store.list_registered_courses(user_id).await?)
    }

    pub async fn certificate_eligibility(
        &self,
        user_id: i32,
    ) -> PortalResult<Vec<CertificateEligibility>> {
        self.require_user(user_id).await?;
        let today = self.today();
        let issued = self.store.list_certificates(user_id).await?;
        let courses = self.store.list_registered_courses(user_id).await?;

        Ok(courses
            .into_iter()
            .map(|course| CertificateEligibility {
                eligible: course.end_date < today,
                issued: issued.iter().any(|c| c.course_id == course.course_id),
                course_id: course.course_id,
                course_name: course.course_name,
                end_date: course.end_date,
            })
            .collect())
    }

    /// Fee due for the semester containing today, or the default fee when none does.
    pub async fn fee_status(&self, user_id: i32) -> PortalResult<FeeStatus> {
        let user = self.require_user(user_id).await?;
        let today = self.today();
        let semester = self
            .store
            .list_semesters()
            .await?
            .into_iter()
            .find(|s| s.contains(today));

        let (amount_eth, paid) = match &semester {
            Some(semester) => (
                semester.fee_amount.clone(),
                self.store
                    .find_fee_payment(user_id, semester.semester_id)
                    .await?
                    .is_some(),
            ),
            None => (self.config.fees.default_amount_eth.clone(), false),
        };

        Ok(FeeStatus {
            user,
            semester,
            amount_eth,
            paid,
        })
    }

    pub async fn user_transactions(&self, user_id: i32) -> PortalResult<Vec<LedgerTransaction>> {
        self.require_user(user_id).await?;
        Ok(self.store.list_transactions(user_id).await?)
    }

    pub async fn courses(&self) -> PortalResult<Vec<Course>> {
        Ok(self.store.list_courses().await?)
    }

    pub async fn course(&self, course_id: i32) -> PortalResult<Course> {
        self.require_course(course_id).await
    }

    pub async fn semesters(&self) -> PortalResult<Vec<Semester>> {
        Ok(self.store.list_semesters().await?)
    }

    pub async fn rooms(&self) -> PortalResult<Vec<Room>> {
        Ok(self.store.list_rooms().await?)
    }

    pub async fn room_bookings(&self, room_id: i32) -> PortalResult<Vec<Booking>> {
        self.require_room(room_id).await?;
        Ok(self.store.list_room_bookings(room_id).await?)
    }

    pub async fn events(&self) -> PortalResult<Vec<Event>> {
        Ok(self.store.list_events().await?)
    }

    pub async fn create_course(&self, course: NewCourse) -> PortalResult<Course> {
        require_text("course_name", &course.course_name)?;
        if let Some(faculty_id) = course.faculty_id {
            if self.store.find_faculty(faculty_id).await?.is_none() {
                return Err(PortalError::NotFound(format!(
                    "Faculty {} not found",
                    faculty_id
                )));
            }
        }
        let course = self.store.insert_course(&course).await?;
        tracing::info!(course_id = course.course_id, "Course created");
        Ok(course)
    }

    /// The configured default fee applies when the request names none.
    pub async fn create_semester(&self, semester: NewSemester) -> PortalResult<Semester> {
        require_text("name", &semester.name)?;
        if semester.end_date < semester.start_date {
            return Err(PortalError::Invalid(
                "Semester must end on or after its start date".to_string(),
            ));
        }
        let fee = semester
            .fee_amount
            .as_deref()
            .map(str::trim)
            .unwrap_or(&self.config.fees.default_amount_eth)
            .to_string();
        parse_amount(&fee).map_err(PortalError::Invalid)?;

        let semester = self.store.insert_semester(&semester, &fee).await?;
        tracing::info!(
            semester_id = semester.semester_id,
            fee_amount = %semester.fee_amount,
            "Semester created"
        );
        Ok(semester)
    }

    pub async fn create_room(&self, room: NewRoom) -> PortalResult<Room> {
        require_text("name", &room.name)?;
        if room.capacity <= 0 {
            return Err(PortalError::Invalid(
                "Room capacity must be positive".to_string(),
            ));
        }
        let room = self.store.insert_room(&room).await?;
        tracing::info!(room_id = room.room_id, "Room created");
        Ok(room)
    }

    pub async fn create_event(&self, event: NewEvent) -> PortalResult<Event> {
        require_text("title", &event.title)?;
        if event.capacity <= 0 {
            return Err(PortalError::Invalid(
                "Event capacity must be positive".to_string(),
            ));
        }
        if event.ends_at <= event.starts_at {
            return Err(PortalError::Invalid(
                "Event must end after it starts".to_string(),
            ));
        }
        if let Some(room_id) = event.room_id {
            self.require_room(room_id).await?;
        }
        let event = self.store.insert_event(&event).await?;
        tracing::info!(event_id = event.event_id, "Event created");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    use super::super::testing::*;
    use super::*;
    use crate::db::PortalStore;

    #[tokio::test]
    async fn test_health_reports_disabled_chain() {
        let (portal, _) = portal_without_chain();
        let health = portal.health().await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.blockchain, "disabled");

        let (portal, _) = portal_with_ledger(Arc::new(ScriptedLedger::new()));
        assert_eq!(portal.health().await.blockchain, "up");
    }

    #[tokio::test]
    async fn test_fee_status_falls_back_to_default() {
        let (portal, store) = portal_without_chain();
        let user = seed_user(&store, None).await;

        let status = portal.fee_status(user.user_id).await.unwrap();
        assert!(status.semester.is_none());
        assert_eq!(status.amount_eth, "0.05");
        assert!(!status.paid);
    }

    #[tokio::test]
    async fn test_fee_status_uses_current_semester() {
        let (portal, store) = portal_without_chain();
        let user = seed_user(&store, None).await;
        let today = Utc::now().date_naive();
        let semester = portal
            .create_semester(NewSemester {
                name: "Spring".to_string(),
                start_date: today - Duration::days(1),
                end_date: today + Duration::days(1),
                fee_amount: Some("0.2".to_string()),
            })
            .await
            .unwrap();

        portal
            .pay_fees(FeePaymentRequest {
                user_id: user.user_id,
                semester_id: semester.semester_id,
                amount: "0.2".to_string(),
            })
            .await
            .unwrap();

        let status = portal.fee_status(user.user_id).await.unwrap();
        assert_eq!(status.semester.map(|s| s.semester_id), Some(semester.semester_id));
        assert_eq!(status.amount_eth, "0.2");
        assert!(status.paid);
    }

    #[tokio::test]
    async fn test_certificate_eligibility_flags() {
        let (portal, store) = portal_without_chain();
        let user = seed_user(&store, None).await;
        let today = Utc::now().date_naive();
        let ended = portal
            .create_course(NewCourse {
                course_name: "Algorithms".to_string(),
                description: None,
                faculty_id: None,
                end_date: today - Duration::days(2),
            })
            .await
            .unwrap();
        let running = portal
            .create_course(NewCourse {
                course_name: "Databases".to_string(),
                description: None,
                faculty_id: None,
                end_date: today + Duration::days(2),
            })
            .await
            .unwrap();
        for course in [&ended, &running] {
            store
                .insert_registration(user.user_id, course.course_id, None)
                .await
                .unwrap();
        }
        portal
            .issue_certificate(CertificateRequest {
                user_id: user.user_id,
                course_id: ended.course_id,
                wallet_address: None,
            })
            .await
            .unwrap();

        let entries = portal.certificate_eligibility(user.user_id).await.unwrap();
        let ended_entry = entries.iter().find(|e| e.course_id == ended.course_id).unwrap();
        let running_entry = entries.iter().find(|e| e.course_id == running.course_id).unwrap();
        assert!(ended_entry.eligible && ended_entry.issued);
        assert!(!running_entry.eligible && !running_entry.issued);
    }

    #[tokio::test]
    async fn test_reference_data_validation() {
        let (portal, _) = portal_without_chain();
        let today = Utc::now().date_naive();

        let err = portal
            .create_semester(NewSemester {
                name: "Backwards".to_string(),
                start_date: today,
                end_date: today - Duration::days(1),
                fee_amount: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Invalid(_)));

        let semester = portal
            .create_semester(NewSemester {
                name: "Default fee".to_string(),
                start_date: today,
                end_date: today,
                fee_amount: None,
            })
            .await
            .unwrap();
        assert_eq!(semester.fee_amount, "0.05");

        let err = portal
            .create_room(NewRoom {
                name: "Closet".to_string(),
                location: None,
                capacity: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Invalid(_)));

        let err = portal
            .create_course(NewCourse {
                course_name: "Orphan".to_string(),
                description: None,
                faculty_id: Some(77),
                end_date: today,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_views_require_user() {
        let (portal, _) = portal_without_chain();
        assert!(matches!(
            portal.user_transactions(5).await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            portal.user_courses(5).await,
            Err(PortalError::NotFound(_))
        ));
    }
}
