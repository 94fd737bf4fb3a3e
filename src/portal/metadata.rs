//! ERC-721 metadata documents served at the token URIs.

use serde::Serialize;
use serde_json::{json, Value};

use super::{Portal, PortalError, PortalResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub trait_type: &'static str,
    pub value: Value,
}

fn attr(trait_type: &'static str, value: impl Into<Value>) -> Attribute {
    Attribute {
        trait_type,
        value: value.into(),
    }
}

impl Portal {
    pub async fn identity_metadata(&self, user_id: i32) -> PortalResult<TokenMetadata> {
        let user = self.require_user(user_id).await?;
        Ok(TokenMetadata {
            description: format!("Digital identity for {}.", user.name),
            attributes: vec![
                attr("Roll Number", user.roll_number),
                attr("Date of Birth", json!(user.dob)),
            ],
            name: user.name,
        })
    }

    pub async fn faculty_metadata(&self, faculty_id: i32) -> PortalResult<TokenMetadata> {
        let faculty = self
            .store
            .find_faculty(faculty_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Faculty {} not found", faculty_id)))?;
        Ok(TokenMetadata {
            description: format!("Faculty identity for {}.", faculty.name),
            attributes: vec![attr("Department", json!(faculty.department))],
            name: faculty.name,
        })
    }

    /// Served for any registered course; the token may be minted before the row lands.
    pub async fn certificate_metadata(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> PortalResult<TokenMetadata> {
        let user = self.require_user(user_id).await?;
        let course = self
            .store
            .find_course(course_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Course {} not found", course_id)))?;
        let registration = self
            .store
            .find_registration(user_id, course_id)
            .await?
            .ok_or_else(|| {
                PortalError::NotFound(format!(
                    "User {} is not registered for course {}",
                    user_id, course_id
                ))
            })?;
        Ok(TokenMetadata {
            name: format!("{} certificate", course.course_name),
            description: format!(
                "Certificate of completion of {} awarded to {}.",
                course.course_name, user.name
            ),
            attributes: vec![
                attr("Roll Number", user.roll_number),
                attr("Course", course.course_name),
                attr("Completed", course.end_date.to_string()),
                attr("Grade", json!(registration.grade)),
            ],
        })
    }

    pub async fn fee_metadata(&self, user_id: i32, semester_id: i32) -> PortalResult<TokenMetadata> {
        let user = self.require_user(user_id).await?;
        let semester = self.require_semester(semester_id).await?;
        Ok(TokenMetadata {
            name: format!("{} fee receipt", semester.name),
            description: format!("Fee payment receipt for {} ({}).", user.name, semester.name),
            attributes: vec![
                attr("Roll Number", user.roll_number),
                attr("Semester", semester.name),
                attr("Amount (ETH)", semester.fee_amount),
            ],
        })
    }

    pub async fn booking_metadata(&self, booking_id: i32) -> PortalResult<TokenMetadata> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Booking {} not found", booking_id)))?;

        let (name, place) = match (booking.room_id, booking.event_id) {
            (Some(room_id), _) => {
                let room = self.require_room(room_id).await?;
                (format!("{} booking", room.name), attr("Room", room.name))
            }
            (None, Some(event_id)) => {
                let event = self.require_event(event_id).await?;
                (format!("{} ticket", event.title), attr("Event", event.title))
            }
            (None, None) => {
                return Err(PortalError::Store(format!(
                    "booking {} has neither room nor event",
                    booking_id
                )))
            }
        };

        Ok(TokenMetadata {
            description: format!("Campus amenity reservation #{}.", booking.booking_id),
            name,
            attributes: vec![
                place,
                attr("Starts", booking.starts_at.to_rfc3339()),
                attr("Ends", booking.ends_at.to_rfc3339()),
            ],
        })
    }
}
