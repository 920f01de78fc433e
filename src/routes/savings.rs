/// Saving goal routes
///
/// Both endpoints sit behind the JWT middleware and act on the caller's
/// own savings only.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::error::{AppError, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::routes::multipart::read_form;
use crate::routes::response::ApiResponse;
use crate::savings::{FillingPlan, NewSaving, SavingsRepository};
use crate::uploads::UploadStore;
use crate::validators::{is_positive_amount, is_valid_currency_code, is_valid_saving_name};

/// POST /api/v1/savings
///
/// Multipart form: name, target_amount, currency_code, filling_plan,
/// filling_nominal and a required `image` file.
///
/// # Errors
/// - 400: Validation errors or unsupported currency
/// - 401: Handled by middleware
/// - 413: Image too large
pub async fn create_saving(
    user: web::ReqData<AuthenticatedUser>,
    payload: Multipart,
    savings: web::Data<dyn SavingsRepository>,
    uploads: web::Data<UploadStore>,
) -> Result<HttpResponse, AppError> {
    let form = read_form(payload, "image", uploads.max_file_size()).await?;

    let name = is_valid_saving_name(form.text("name"))?;
    let target_amount = is_positive_amount("target_amount", form.text("target_amount"))?;
    let currency_code = is_valid_currency_code(form.text("currency_code"))?;
    let filling_plan = form.text("filling_plan").parse::<FillingPlan>()?;
    let filling_nominal = is_positive_amount("filling_nominal", form.text("filling_nominal"))?;
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| ValidationError::EmptyField("image".to_string()))?;

    let image = uploads.save(&file.filename, &file.bytes).await?;

    let created = savings
        .create(
            NewSaving {
                name,
                target_amount,
                currency_code,
                image: image.clone(),
                filling_plan,
                filling_nominal,
            },
            &user.identity,
        )
        .await;

    let saving = match created {
        Ok(saving) => saving,
        Err(e) => {
            uploads.remove(&image).await;
            return Err(e.into());
        }
    };

    Ok(HttpResponse::Created().json(ApiResponse::with_data("Saving created", saving)))
}

/// GET /api/v1/savings
pub async fn list_savings(
    user: web::ReqData<AuthenticatedUser>,
    savings: web::Data<dyn SavingsRepository>,
) -> Result<HttpResponse, AppError> {
    let items = savings.list_for_user(&user.identity).await?;

    tracing::debug!(user_uuid = %user.user_uuid, count = items.len(), "Savings listed");

    Ok(HttpResponse::Ok().json(ApiResponse::with_data("Savings retrieved", items)))
}
