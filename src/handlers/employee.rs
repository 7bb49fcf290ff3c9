use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use url::Url;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::filters::employee::EmployeeFilterParams;
use crate::services::employee::{EmployeePayload, WriteMode};
use crate::state::AppState;
use crate::utils::pagination::{PageParams, PageRequest};

fn request_url(req: &HttpRequest) -> Result<Url, AppError> {
    let info = req.connection_info();
    Url::parse(&format!("{}://{}{}", info.scheme(), info.host(), req.uri()))
        .map_err(|err| AppError::InternalServerError(format!("Bad request URL: {}", err)))
}

pub async fn get_employees(
    _principal: Principal,
    req: HttpRequest,
    state: web::Data<AppState>,
    filters: web::Query<EmployeeFilterParams>,
    page: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::from_params(&page, state.page_size)?;
    let url = request_url(&req)?;
    let response = state.employees.list(&filters, page, &url).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn create_employee(
    principal: Principal,
    state: web::Data<AppState>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let employee = state.employees.create(payload.into_inner()).await?;
    info!("{} created employee {}", principal, employee.id);
    Ok(HttpResponse::Created().json(employee))
}

pub async fn get_employee(
    _principal: Principal,
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee = state.employees.retrieve(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn replace_employee(
    _principal: Principal,
    state: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let employee = state
        .employees
        .update(id.into_inner(), payload.into_inner(), WriteMode::Full)
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn update_employee(
    _principal: Principal,
    state: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let employee = state
        .employees
        .update(id.into_inner(), payload.into_inner(), WriteMode::Partial)
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn delete_employee(
    principal: Principal,
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    state.employees.destroy(id).await?;
    info!("{} deleted employee {}", principal, id);
    Ok(HttpResponse::NoContent().finish())
}
