use crate::api::attendance::{ClockEcho, ClockRequest, ClockResponse, HistoryQuery};
use crate::api::user::ProfileResponse;
use crate::attendance::service::{
    DayView, HistoryPage, Pagination, TodaySummary, TodayView, TotalStats, UserStats, WeekStats,
    WorkStatus,
};
use crate::attendance::summary::AttendanceSummary;
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceRecord, ClockEvent, ClockEventType};
use crate::models::{LoginReqDto, PasswordChangeReq, ProfileUpdateReq, RegisterReq, UserSummary};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kintai API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Employees punch in and out, take breaks, and review their working time.

### 🔹 Key Features
- **Punching**
  - Clock in, clock out, start and end breaks; one record per user per day
- **History**
  - Filter by date, month or month of a year, paginated, with a summary
- **Export**
  - Download records as CSV
- **Account**
  - Profile, password change and work statistics

### 🔐 Security
Every endpoint except register and login needs a **JWT Bearer** token.

### 📦 Response Format
- JSON responses; errors carry a stable `code` and a human `error`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,

        crate::api::attendance::clock,
        crate::api::attendance::today_attendance,
        crate::api::attendance::history,
        crate::api::attendance::by_date,
        crate::api::attendance::export,

        crate::api::user::get_profile,
        crate::api::user::update_profile,
        crate::api::user::change_password,
        crate::api::user::stats
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            UserSummary,
            ProfileUpdateReq,
            PasswordChangeReq,
            ProfileResponse,
            ClockEventType,
            ClockEvent,
            ClockRequest,
            ClockEcho,
            ClockResponse,
            HistoryQuery,
            AttendanceRecord,
            AttendanceSummary,
            WorkStatus,
            TodaySummary,
            TodayView,
            DayView,
            Pagination,
            HistoryPage,
            WeekStats,
            TotalStats,
            UserStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Attendance", description = "Punching and attendance history"),
        (name = "User", description = "Profile and statistics"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
