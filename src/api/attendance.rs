use crate::{
    attendance::{
        export::{export_filename, render_csv},
        filter::{HistoryFilter, parse_date},
        service::{self, DayView, HistoryPage, TodayView},
    },
    auth::auth::AuthUser,
    error::AppError,
    model::attendance::{AttendanceRecord, ClockEvent, ClockEventType},
    store::AttendanceStore,
};
use actix_web::{HttpResponse, http::header, web};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ClockRequest {
    /// clock-in | clock-out | break-start | break-end
    #[serde(rename = "type")]
    #[schema(example = "clock-in")]
    pub kind: Option<String>,
    /// Time of day, `HH:MM:SS` or `HH:MM`
    #[schema(example = "09:00:00")]
    pub time: Option<String>,
}

impl TryFrom<&ClockRequest> for ClockEvent {
    type Error = AppError;

    fn try_from(req: &ClockRequest) -> Result<Self, Self::Error> {
        let (Some(kind), Some(time)) = (
            req.kind.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            req.time.as_deref().map(str::trim).filter(|v| !v.is_empty()),
        ) else {
            return Err(AppError::Validation("Type and time are required".into()));
        };

        let kind = ClockEventType::from_str(kind)
            .map_err(|_| AppError::Validation("Invalid type".into()))?;

        let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .map_err(|_| AppError::Validation("Invalid time format. Use HH:MM:SS".into()))?;

        Ok(ClockEvent::new(kind, time))
    }
}

#[derive(Serialize, ToSchema)]
pub struct ClockEcho {
    #[serde(rename = "type")]
    pub kind: ClockEventType,
    #[schema(value_type = String)]
    pub time: NaiveTime,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct ClockResponse {
    pub success: bool,
    pub message: String,
    pub record: ClockEcho,
    pub attendance: AttendanceRecord,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Exact date, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Month 1-12; alone it matches that month in every year
    pub month: Option<String>,
    /// Year; only valid together with `month`
    pub year: Option<String>,
    /// Page number (starts with 1)
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub limit: Option<u32>,
}

impl HistoryQuery {
    fn filter(&self) -> Result<HistoryFilter, AppError> {
        HistoryFilter::from_query(
            self.date.as_deref(),
            self.month.as_deref(),
            self.year.as_deref(),
        )
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Record a punch for today
#[utoipa::path(
    post,
    path = "/api/attendance/clock",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Punch recorded", body = ClockResponse),
        (status = 400, description = "Invalid input or punch not allowed", body = Object, example = json!({
            "code": "ALREADY_CLOCKED_IN",
            "error": "Already clocked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    payload: web::Json<ClockRequest>,
) -> Result<HttpResponse, AppError> {
    let event = ClockEvent::try_from(&*payload)?;
    let date = today();

    let outcome = service::clock(store.get_ref(), auth.user_id, date, event).await?;

    Ok(HttpResponse::Ok().json(ClockResponse {
        success: true,
        message: "Punch recorded".into(),
        record: ClockEcho {
            kind: outcome.event.kind,
            time: outcome.event.time,
            date,
        },
        attendance: outcome.record,
    }))
}

/// Today's punches and status
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's attendance", body = TodayView),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
) -> Result<HttpResponse, AppError> {
    let view = service::today(store.get_ref(), auth.user_id, today()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Paginated attendance history with a summary
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Attendance history", body = HistoryPage),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.filter()?;
    let page = service::history(
        store.get_ref(),
        auth.user_id,
        &filter,
        query.page,
        query.limit,
    )
    .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Attendance of a single date
#[utoipa::path(
    get,
    path = "/api/attendance/date/{date}",
    params(
        ("date" = String, Path, description = "Date as YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Record and punches, or a null record", body = DayView),
        (status = 400, description = "Invalid date format"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn by_date(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let date = parse_date(&path.into_inner())?;
    let view = service::day(store.get_ref(), auth.user_id, date).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Export attendance as CSV
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(HistoryQuery),
    responses(
        (status = 200, description = "CSV file", body = String, content_type = "text/csv"),
        (status = 404, description = "No data found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn export(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.filter()?;
    let records = service::export_records(store.get_ref(), auth.user_id, &filter).await?;

    if records.is_empty() {
        return Err(AppError::NotFound("No data found".into()));
    }

    let filename = export_filename(query.month.as_deref(), query.year.as_deref());

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(render_csv(&records)))
}
