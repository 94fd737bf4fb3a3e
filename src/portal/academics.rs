//! Course registration, certificates and grading.

use super::{Portal, PortalError, PortalResult};
use crate::domain::{
    Certificate, CertificateRequest, Course, CourseRegistrationRequest, GradeRequest, LedgerEntry,
    NewCertificate, Registration, TxKind,
};

impl Portal {
    pub(crate) async fn require_course(&self, course_id: i32) -> PortalResult<Course> {
        self.store
            .find_course(course_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Course {} not found", course_id)))
    }

    /// Register a student for a course: contract first, then the row.
    pub async fn register_course(
        &self,
        request: CourseRegistrationRequest,
    ) -> PortalResult<Registration> {
        let user = self.require_user(request.user_id).await?;
        let course = self.require_course(request.course_id).await?;
        self.require_identity(&user)?;

        if self
            .store
            .find_registration(user.user_id, course.course_id)
            .await?
            .is_some()
        {
            return Err(PortalError::Conflict(format!(
                "User {} is already registered for course {}",
                user.user_id, course.course_id
            )));
        }
        if course.has_ended(self.today()) {
            return Err(PortalError::Invalid(format!(
                "Course {} ended on {}",
                course.course_id, course.end_date
            )));
        }

        let entry = match &self.ledger {
            Some(ledger) => {
                let student = self.recipient(&user, request.wallet_address.as_deref())?;
                let receipt = ledger
                    .register_course(student, course.course_id as u64)
                    .await?;
                Some(LedgerEntry {
                    user_id: user.user_id,
                    kind: TxKind::CourseRegistration,
                    amount: None,
                    tx_hash: receipt.tx_hash,
                })
            }
            None => None,
        };

        let registration = match self
            .store
            .insert_registration(user.user_id, course.course_id, entry.as_ref())
            .await
        {
            Ok(registration) => registration,
            Err(e) => {
                return Err(match &entry {
                    Some(entry) => self.diverged("course_registration", &entry.tx_hash, e),
                    None => e.into(),
                })
            }
        };

        tracing::info!(
            user_id = user.user_id,
            course_id = course.course_id,
            tx_hash = ?registration.tx_hash,
            "Course registered"
        );
        Ok(registration)
    }

    /// Issue a completion certificate once the course has ended.
    pub async fn issue_certificate(&self, request: CertificateRequest) -> PortalResult<Certificate> {
        let user = self.require_user(request.user_id).await?;
        let course = self.require_course(request.course_id).await?;

        if self
            .store
            .find_registration(user.user_id, course.course_id)
            .await?
            .is_none()
        {
            return Err(PortalError::NotFound(format!(
                "User {} is not registered for course {}",
                user.user_id, course.course_id
            )));
        }
        if !course.has_ended(self.today()) {
            return Err(PortalError::Invalid(format!(
                "Course {} has not ended yet (ends {})",
                course.course_id, course.end_date
            )));
        }
        if self
            .store
            .find_certificate(user.user_id, course.course_id)
            .await?
            .is_some()
        {
            return Err(PortalError::Conflict(format!(
                "Certificate already issued for course {}",
                course.course_id
            )));
        }
        self.require_identity(&user)?;

        let uri = self.certificate_uri(user.user_id, course.course_id);
        let receipt = match &self.ledger {
            Some(ledger) => {
                let student = self.recipient(&user, request.wallet_address.as_deref())?;
                Some(ledger.issue_certificate(student, &uri).await?)
            }
            None => None,
        };

        let certificate = NewCertificate {
            user_id: user.user_id,
            course_id: course.course_id,
            uri,
            token_id: receipt.as_ref().and_then(|r| r.token_id.clone()),
            tx_hash: receipt.as_ref().map(|r| r.tx_hash.clone()),
        };
        let entry = receipt.as_ref().map(|r| LedgerEntry {
            user_id: user.user_id,
            kind: TxKind::CertificateIssue,
            amount: None,
            tx_hash: r.tx_hash.clone(),
        });

        let certificate = match self
            .store
            .insert_certificate(&certificate, entry.as_ref())
            .await
        {
            Ok(certificate) => certificate,
            Err(e) => {
                return Err(match &entry {
                    Some(entry) => self.diverged("certificate_issue", &entry.tx_hash, e),
                    None => e.into(),
                })
            }
        };

        tracing::info!(
            user_id = user.user_id,
            course_id = course.course_id,
            token_id = ?certificate.token_id,
            "Certificate issued"
        );
        Ok(certificate)
    }

    /// Record a grade. Only the faculty member teaching the course may grade it.
    pub async fn assign_grade(
        &self,
        faculty_id: i32,
        request: GradeRequest,
    ) -> PortalResult<Registration> {
        if self.store.find_faculty(faculty_id).await?.is_none() {
            return Err(PortalError::NotFound(format!(
                "Faculty {} not found",
                faculty_id
            )));
        }
        let course = self.require_course(request.course_id).await?;
        if course.faculty_id != Some(faculty_id) {
            return Err(PortalError::Forbidden(format!(
                "Faculty {} does not teach course {}",
                faculty_id, course.course_id
            )));
        }
        let registration = self
            .store
            .find_registration(request.user_id, course.course_id)
            .await?
            .ok_or_else(|| {
                PortalError::NotFound(format!(
                    "User {} is not registered for course {}",
                    request.user_id, course.course_id
                ))
            })?;
        if !(0..=100).contains(&request.grade) {
            return Err(PortalError::Invalid(format!(
                "Grade {} must be between 0 and 100",
                request.grade
            )));
        }

        let registration = self
            .store
            .set_grade(registration.registration_id, request.grade)
            .await?;
        tracing::info!(
            faculty_id = faculty_id,
            user_id = request.user_id,
            course_id = course.course_id,
            grade = request.grade,
            "Grade assigned"
        );
        Ok(registration)
    }
}
