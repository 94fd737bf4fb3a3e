//! Public portal routes.
//!
//! Mutating handlers run their operation on a spawned task and await it.
//! A request timeout then only drops the wait: the task still reaches its
//! contract call, and its compensating delete when that call fails.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use std::future::Future;

use crate::domain::*;
use crate::http::extract::{ApiJson, ApiPath};
use crate::http::response::success;
use crate::portal::metadata::TokenMetadata;
use crate::portal::{Portal, PortalError};

type ApiResult<T> = Result<T, PortalError>;

/// Run a portal mutation to completion independently of the request future.
async fn detached<T, F>(operation: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: Future<Output = ApiResult<T>> + Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| PortalError::Internal(format!("operation task failed: {}", e)))?
}

pub async fn health(State(portal): State<Portal>) -> Response {
    let report = portal.health().await;
    let status = if report.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

pub async fn register_user(
    State(portal): State<Portal>,
    ApiJson(request): ApiJson<NewUser>,
) -> ApiResult<Response> {
    let user = detached(async move { portal.register_user(request).await }).await?;
    Ok(success(StatusCode::OK, "user", user))
}

pub async fn register_faculty(
    State(portal): State<Portal>,
    ApiJson(request): ApiJson<NewFaculty>,
) -> ApiResult<Response> {
    let faculty = detached(async move { portal.register_faculty(request).await }).await?;
    Ok(success(StatusCode::OK, "faculty", faculty))
}

pub async fn register_course(
    State(portal): State<Portal>,
    ApiJson(request): ApiJson<CourseRegistrationRequest>,
) -> ApiResult<Response> {
    let registration = detached(async move { portal.register_course(request).await }).await?;
    Ok(success(StatusCode::OK, "registration", registration))
}

pub async fn issue_certificate(
    State(portal): State<Portal>,
    ApiJson(request): ApiJson<CertificateRequest>,
) -> ApiResult<Response> {
    let certificate = detached(async move { portal.issue_certificate(request).await }).await?;
    Ok(success(StatusCode::OK, "certificate", certificate))
}

pub async fn pay_fees(
    State(portal): State<Portal>,
    ApiJson(request): ApiJson<FeePaymentRequest>,
) -> ApiResult<Response> {
    let payment = detached(async move { portal.pay_fees(request).await }).await?;
    Ok(success(StatusCode::OK, "payment", payment))
}

pub async fn book_room(
    State(portal): State<Portal>,
    ApiPath(room_id): ApiPath<i32>,
    ApiJson(request): ApiJson<RoomBookingRequest>,
) -> ApiResult<Response> {
    let booking = detached(async move { portal.book_room(room_id, request).await }).await?;
    Ok(success(StatusCode::OK, "booking", booking))
}

pub async fn join_event(
    State(portal): State<Portal>,
    ApiPath(event_id): ApiPath<i32>,
    ApiJson(request): ApiJson<EventJoinRequest>,
) -> ApiResult<Response> {
    let booking = detached(async move { portal.join_event(event_id, request).await }).await?;
    Ok(success(StatusCode::OK, "booking", booking))
}

pub async fn assign_grade(
    State(portal): State<Portal>,
    ApiPath(faculty_id): ApiPath<i32>,
    ApiJson(request): ApiJson<GradeRequest>,
) -> ApiResult<Response> {
    let registration =
        detached(async move { portal.assign_grade(faculty_id, request).await }).await?;
    Ok(success(StatusCode::OK, "registration", registration))
}

pub async fn identity_metadata(
    State(portal): State<Portal>,
    ApiPath(user_id): ApiPath<i32>,
) -> ApiResult<Json<TokenMetadata>> {
    Ok(Json(portal.identity_metadata(user_id).await?))
}

pub async fn faculty_metadata(
    State(portal): State<Portal>,
    ApiPath(faculty_id): ApiPath<i32>,
) -> ApiResult<Json<TokenMetadata>> {
    Ok(Json(portal.faculty_metadata(faculty_id).await?))
}

pub async fn certificate_metadata(
    State(portal): State<Portal>,
    ApiPath((user_id, course_id)): ApiPath<(i32, i32)>,
) -> ApiResult<Json<TokenMetadata>> {
    Ok(Json(portal.certificate_metadata(user_id, course_id).await?))
}

pub async fn fee_metadata(
    State(portal): State<Portal>,
    ApiPath((user_id, semester_id)): ApiPath<(i32, i32)>,
) -> ApiResult<Json<TokenMetadata>> {
    Ok(Json(portal.fee_metadata(user_id, semester_id).await?))
}

pub async fn booking_metadata(
    State(portal): State<Portal>,
    ApiPath(booking_id): ApiPath<i32>,
) -> ApiResult<Json<TokenMetadata>> {
    Ok(Json(portal.booking_metadata(booking_id).await?))
}

pub async fn user_profile(
    State(portal): State<Portal>,
    ApiPath(user_id): ApiPath<i32>,
) -> ApiResult<Json<User>> {
    Ok(Json(portal.user_profile(user_id).await?))
}

pub async fn user_courses(
    State(portal): State<Portal>,
    ApiPath(user_id): ApiPath<i32>,
) -> ApiResult<Json<Vec<RegisteredCourse>>> {
    Ok(Json(portal.user_courses(user_id).await?))
}

pub async fn user_certificates(
    State(portal): State<Portal>,
    ApiPath(user_id): ApiPath<i32>,
) -> ApiResult<Json<Vec<CertificateEligibility>>> {
    Ok(Json(portal.certificate_eligibility(user_id).await?))
}

pub async fn user_fees(
    State(portal): State<Portal>,
    ApiPath(user_id): ApiPath<i32>,
) -> ApiResult<Json<FeeStatus>> {
    Ok(Json(portal.fee_status(user_id).await?))
}

pub async fn user_transactions(
    State(portal): State<Portal>,
    ApiPath(user_id): ApiPath<i32>,
) -> ApiResult<Json<Vec<LedgerTransaction>>> {
    Ok(Json(portal.user_transactions(user_id).await?))
}

pub async fn list_courses(State(portal): State<Portal>) -> ApiResult<Json<Vec<Course>>> {
    Ok(Json(portal.courses().await?))
}

pub async fn get_course(
    State(portal): State<Portal>,
    ApiPath(course_id): ApiPath<i32>,
) -> ApiResult<Json<Course>> {
    Ok(Json(portal.course(course_id).await?))
}

pub async fn list_semesters(State(portal): State<Portal>) -> ApiResult<Json<Vec<Semester>>> {
    Ok(Json(portal.semesters().await?))
}

pub async fn list_rooms(State(portal): State<Portal>) -> ApiResult<Json<Vec<Room>>> {
    Ok(Json(portal.rooms().await?))
}

pub async fn room_bookings(
    State(portal): State<Portal>,
    ApiPath(room_id): ApiPath<i32>,
) -> ApiResult<Json<Vec<Booking>>> {
    Ok(Json(portal.room_bookings(room_id).await?))
}

pub async fn list_events(State(portal): State<Portal>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(portal.events().await?))
}
