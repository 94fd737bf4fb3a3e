use axum::{extract::State, http::StatusCode, response::Response, Json};

use crate::domain::{NewCourse, NewEvent, NewRoom, NewSemester};
use crate::http::extract::ApiJson;
use crate::http::response::success;
use crate::portal::{AdminStatus, Portal, PortalError};

pub async fn get_status(State(portal): State<Portal>) -> Json<AdminStatus> {
    Json(portal.status().await)
}

pub async fn create_course(
    State(portal): State<Portal>,
    ApiJson(course): ApiJson<NewCourse>,
) -> Result<Response, PortalError> {
    let course = portal.create_course(course).await?;
    Ok(success(StatusCode::CREATED, "course", course))
}

pub async fn create_semester(
    State(portal): State<Portal>,
    ApiJson(semester): ApiJson<NewSemester>,
) -> Result<Response, PortalError> {
    let semester = portal.create_semester(semester).await?;
    Ok(success(StatusCode::CREATED, "semester", semester))
}

pub async fn create_room(
    State(portal): State<Portal>,
    ApiJson(room): ApiJson<NewRoom>,
) -> Result<Response, PortalError> {
    let room = portal.create_room(room).await?;
    Ok(success(StatusCode::CREATED, "room", room))
}

pub async fn create_event(
    State(portal): State<Portal>,
    ApiJson(event): ApiJson<NewEvent>,
) -> Result<Response, PortalError> {
    let event = portal.create_event(event).await?;
    Ok(success(StatusCode::CREATED, "event", event))
}
