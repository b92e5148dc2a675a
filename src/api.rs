//! Web API

// Actix handlers have lots of needless pass-by-value (Data, Path, and Query structs)
#![allow(clippy::needless_pass_by_value)]

use actix_web::{HttpRequest, HttpResponse};
use actix_web::http::header;
use actix_web::web::{self, Data, Path, Payload, Query, ServiceConfig};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;

use crate::cameras::{self, Camera, CameraQuery, NewCamera};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::filters::{Filters, Metadata};
use crate::json;
use crate::validator::Validator;


/// Header carrying the camera version a PATCH was prepared against
pub const EXPECTED_VERSION: &str = "X-Expected-Version";


/// Reads the `id` path parameter
///
/// Anything other than a positive integer cannot name a camera, so it is
/// reported as not found.
fn read_id(raw: &str) -> Result<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(Error::NotFound),
    }
}


/// Reads the optional `X-Expected-Version` request header
fn read_expected_version(request: &HttpRequest) -> Result<Option<i32>> {

    let value = match request.headers().get(EXPECTED_VERSION) {
        Some(value) => value,
        None => return Ok(None),
    };

    value.to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| Error::BadRequest(format!("{} header must be an integer", EXPECTED_VERSION)))
}


//#region CRUD for Cameras

/// Camera representation accepted by POST requests
///
/// Missing fields decode as empty strings so that validation can report them.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CreateCameraBody {
    name: String,
    mac_address: String,
    site_name: String,
    model_no: String,
    username: String,
    password: String,
}

async fn create_camera(
    db: Data<Database>,
    payload: Payload,
) -> Result<HttpResponse>
{
    let body: CreateCameraBody = json::read(payload).await?;
    let new_cam = NewCamera {
        name: body.name,
        mac_address: body.mac_address,
        site_name: body.site_name,
        model_no: body.model_no,
        username: body.username,
        password: body.password,
    };

    let mut v = Validator::new();
    new_cam.validate(&mut v);
    v.into_result()?;

    let camera = db.run(move |conn| new_cam.insert(conn))
        .await?;

    info!("created camera {}", camera.id);

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/cameras/{}", camera.id)))
        .json(json!({ "camera": camera })))
}

async fn show_camera(
    db: Data<Database>,
    path: Path<String>,
) -> Result<HttpResponse>
{
    let id = read_id(&path)?;
    let camera = db.run(move |conn| Camera::get(id, conn))
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "camera": camera })))
}

/// Query string accepted by the camera list endpoint
#[derive(Debug, Default)]
struct ListCamerasQuery {
    name: Option<String>,
    mac_address: Option<String>,
    model_no: Option<String>,
    site_name: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
}

impl ListCamerasQuery {

    /// Collects the recognized parameters, keeping the first value of a repeated key
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {

        let mut query = ListCamerasQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "name"        => &mut query.name,
                "mac_address" => &mut query.mac_address,
                "model_no"    => &mut query.model_no,
                "site_name"   => &mut query.site_name,
                "page"        => &mut query.page,
                "page_size"   => &mut query.page_size,
                "sort"        => &mut query.sort,
                _             => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        query
    }
}

async fn list_cameras(
    db: Data<Database>,
    pairs: Query<Vec<(String, String)>>,
) -> Result<HttpResponse>
{
    let query = ListCamerasQuery::from_pairs(pairs.into_inner());

    let mut v = Validator::new();
    let filters = Filters::parse(
        query.page.as_deref(),
        query.page_size.as_deref(),
        query.sort.as_deref(),
        "id",
        cameras::SORT_SAFELIST,
        &mut v,
    );
    filters.validate(&mut v);
    v.into_result()?;

    let search = CameraQuery {
        name: query.name.unwrap_or_default(),
        mac_address: query.mac_address.unwrap_or_default(),
        model_no: query.model_no.unwrap_or_default(),
        site_name: query.site_name.unwrap_or_default(),
    };

    debug!("listing cameras matching {:?}", search);
    let page_filters = filters.clone();
    let (cameras, total) = db.run(move |conn| Camera::get_all(&search, &page_filters, conn))
        .await?;
    let metadata = Metadata::calculate(total, filters.page, filters.page_size);

    Ok(HttpResponse::Ok().json(json!({ "cameras": cameras, "metadata": metadata })))
}

/// Camera representation accepted by PATCH requests
///
/// Only the fields present in the request are changed.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatchCameraBody {
    name: Option<String>,
    mac_address: Option<String>,
    site_name: Option<String>,
    model_no: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl PatchCameraBody {

    fn apply(self, camera: &mut Camera) {
        if let Some(name) = self.name {
            camera.name = name;
        }
        if let Some(mac_address) = self.mac_address {
            camera.mac_address = mac_address;
        }
        if let Some(site_name) = self.site_name {
            camera.site_name = site_name;
        }
        if let Some(model_no) = self.model_no {
            camera.model_no = model_no;
        }
        if let Some(username) = self.username {
            camera.username = username;
        }
        if let Some(password) = self.password {
            camera.password = password;
        }
    }
}

/// Updates the specified camera
///
/// The camera is read, patched, and written back only if its stored version
/// is still the one that was read. Clients may also name the version they
/// expect in the `X-Expected-Version` header.
async fn update_camera(
    db: Data<Database>,
    path: Path<String>,
    request: HttpRequest,
    payload: Payload,
) -> Result<HttpResponse>
{
    let id = read_id(&path)?;
    let mut camera = db.run(move |conn| Camera::get(id, conn))
        .await?;

    if let Some(expected) = read_expected_version(&request)? {
        if expected != camera.version {
            debug!("camera {} is at version {}, client expected {}", id, camera.version, expected);
            return Err(Error::EditConflict);
        }
    }

    let body: PatchCameraBody = json::read(payload).await?;
    body.apply(&mut camera);

    let mut v = Validator::new();
    camera.validate(&mut v);
    v.into_result()?;

    let camera = db.run(move |conn| {
            camera.update(conn)?;
            Ok(camera)
        })
        .await?;

    info!("updated camera {} to version {}", camera.id, camera.version);

    Ok(HttpResponse::Ok().json(json!({ "camera": camera })))
}

async fn delete_camera(
    db: Data<Database>,
    path: Path<String>,
) -> Result<HttpResponse>
{
    let id = read_id(&path)?;
    db.run(move |conn| Camera::delete(id, conn))
        .await?;

    info!("deleted camera {}", id);

    Ok(HttpResponse::Ok().json(json!({ "message": "camera successfully deleted" })))
}

//#endregion


/// Reports application status, operating environment, and version
async fn healthcheck(config: Data<Config>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "available",
        "system_info": {
            "environment": config.env,
            "version": env!("CARGO_PKG_VERSION"),
        },
    }))
}


/// Handles requests that match no route
pub async fn not_found() -> Result<HttpResponse> {
    Err(Error::NotFound)
}


/// Handles requests that match a route, but none of its methods
pub async fn method_not_allowed(request: HttpRequest) -> Result<HttpResponse> {
    Err(Error::MethodNotAllowed(request.method().clone()))
}


/// Configures an Actix service to serve the API
pub fn configure(db: Database, config: Config) -> impl Fn(&mut ServiceConfig) + Clone {

    let db = Data::new(db);
    let config = Data::new(config);

    move |service: &mut ServiceConfig| {
        service.app_data(db.clone());
        service.app_data(config.clone());
        service.app_data(
            web::QueryConfig::default()
                .error_handler(|err, _| Error::BadRequest(err.to_string()).into())
        );

        service.service(
            web::resource("/healthcheck")
                .route(web::get().to(healthcheck))
                .default_service(web::to(method_not_allowed))
        );

        service.service(
            web::resource("/cameras")
                .route(web::get().to(list_cameras))
                .route(web::post().to(create_camera))
                .default_service(web::to(method_not_allowed))
        );

        service.service(
            web::resource("/cameras/{id}")
                .route(web::get().to(show_camera))
                .route(web::patch().to(update_camera))
                .route(web::delete().to(delete_camera))
                .default_service(web::to(method_not_allowed))
        );

        service.default_service(web::to(not_found));
    }
}


#[cfg(test)]
mod tests {

    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(read_id("7").unwrap(), 7);
        assert!(matches!(read_id("0"), Err(Error::NotFound)));
        assert!(matches!(read_id("-3"), Err(Error::NotFound)));
        assert!(matches!(read_id("abc"), Err(Error::NotFound)));
        assert!(matches!(read_id("1.5"), Err(Error::NotFound)));
    }

    #[test]
    fn expected_version_header_is_optional() {
        let request = TestRequest::default().to_http_request();
        assert_eq!(read_expected_version(&request).unwrap(), None);

        let request = TestRequest::default()
            .insert_header((EXPECTED_VERSION, "3"))
            .to_http_request();
        assert_eq!(read_expected_version(&request).unwrap(), Some(3));

        let request = TestRequest::default()
            .insert_header((EXPECTED_VERSION, "three"))
            .to_http_request();
        assert!(matches!(read_expected_version(&request), Err(Error::BadRequest(_))));
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut camera = Camera {
            id: 1,
            created_at: chrono::NaiveDateTime::default(),
            name: String::from("Lobby Cam"),
            mac_address: String::from("ACCC85930342"),
            site_name: String::from("NYC-5thAve-OPS"),
            model_no: String::from("X100"),
            username: String::from("root"),
            password: String::from("pass"),
            version: 1,
        };

        let body: PatchCameraBody = json::decode(br#"{"name": "Lobby Cam 2", "model_no": null}"#)
            .unwrap();
        body.apply(&mut camera);

        assert_eq!(camera.name, "Lobby Cam 2");
        assert_eq!(camera.model_no, "X100");
        assert_eq!(camera.mac_address, "ACCC85930342");
        assert_eq!(camera.password, "pass");
    }

    #[test]
    fn list_query_keeps_first_value() {
        let pairs = vec![
            (String::from("page"), String::from("1")),
            (String::from("name"), String::from("Dock")),
            (String::from("page"), String::from("2")),
            (String::from("color"), String::from("red")),
            (String::from("name"), String::from("Cafe")),
        ];

        let query = ListCamerasQuery::from_pairs(pairs);
        assert_eq!(query.page.as_deref(), Some("1"));
        assert_eq!(query.name.as_deref(), Some("Dock"));
        assert_eq!(query.sort, None);
    }

    #[test]
    fn create_body_defaults_missing_fields() {
        let body: CreateCameraBody = json::decode(br#"{"name": "Lobby Cam"}"#).unwrap();
        assert_eq!(body.name, "Lobby Cam");
        assert_eq!(body.mac_address, "");
    }
}
