//! Camera management


use chrono::{NaiveDateTime, SecondsFormat};
use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};
use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::db::schema::cameras;
use crate::error::{Error, Result};
use crate::filters::{Direction, Filters};
use crate::validator::{self, Validator};


lazy_static! {
    /// Site names look like *City-Street_Number-Office_Type*
    static ref SITE_NAME_RX: Regex = Regex::new("^.*-.*-(OPS|COE|GLH)$").unwrap();
}


/// Sort values accepted by the camera list endpoint
pub const SORT_SAFELIST: &[&str] = &[
    "id", "name", "mac_address", "site_name", "model_no",
    "-id", "-name", "-mac_address", "-site_name", "-model_no",
];


/// Represents a managed camera
///
/// Credentials are stored, but never serialized.
#[derive(Clone, Debug, PartialEq)]
#[derive(Queryable, Selectable, Serialize)]
#[diesel(table_name = cameras)]
#[diesel(check_for_backend(Sqlite))]
pub struct Camera {
    pub id: i64,
    #[serde(serialize_with = "utc_timestamp")]
    pub created_at: NaiveDateTime,
    pub name: String,
    pub mac_address: String,
    pub site_name: String,
    pub model_no: String,
    #[serde(skip_serializing)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub version: i32,
}


/// Information needed to create a new camera
#[derive(Clone, Debug, Default, Insertable)]
#[diesel(table_name = cameras)]
pub struct NewCamera {
    pub name: String,
    pub mac_address: String,
    pub site_name: String,
    pub model_no: String,
    pub username: String,
    pub password: String,
}


/// Optional substring filters for listing cameras
///
/// Empty values match everything.
#[derive(Clone, Debug, Default)]
pub struct CameraQuery {
    pub name: String,
    pub mac_address: String,
    pub model_no: String,
    pub site_name: String,
}


fn validate_fields(v: &mut Validator, name: &str, mac_address: &str, site_name: &str) {
    v.check(!name.is_empty(), "name", "must be provided");
    v.check(name.len() <= 500, "name", "must not be more than 500 bytes long");
    v.check(mac_address.len() == 12, "mac_address", "must be 12 characters");
    v.check(
        validator::matches(site_name, &SITE_NAME_RX),
        "site_name",
        "must be like 'City-Street_Number-Office_Type'",
    );
}


impl NewCamera {

    pub fn validate(&self, v: &mut Validator) {
        validate_fields(v, &self.name, &self.mac_address, &self.site_name);
    }

    /// Adds this camera to the database, returning the stored record
    pub fn insert(&self, conn: &mut SqliteConnection) -> Result<Camera> {

        debug!("adding new camera to database");
        let camera: Camera = diesel::insert_into(cameras::table)
            .values(self)
            .returning(Camera::as_returning())
            .get_result(conn)?;

        debug!("created camera {}", camera.id);
        Ok(camera)
    }
}


impl Camera {

    pub fn validate(&self, v: &mut Validator) {
        validate_fields(v, &self.name, &self.mac_address, &self.site_name);
    }

    /// Gets the specified camera from the database
    pub fn get(id: i64, conn: &mut SqliteConnection) -> Result<Camera> {

        if id < 1 {
            return Err(Error::NotFound);
        }

        trace!("retrieving camera {} from database", id);
        let camera = cameras::table.find(id)
            .select(Camera::as_select())
            .get_result(conn)?;

        Ok(camera)
    }

    /// Gets one page of cameras matching `query`, plus the total number of matches
    pub fn get_all(
        query: &CameraQuery,
        filters: &Filters,
        conn: &mut SqliteConnection,
    ) -> Result<(Vec<Camera>, i64)>
    {
        // Count and page are read together so the totals describe the rows returned
        conn.transaction::<_, Error, _>(|conn| {

            trace!("counting cameras matching {:?}", query);
            let total: i64 = filtered(query)
                .count()
                .get_result(conn)?;

            let select = filtered(query);
            let select = match (filters.sort_column(), filters.sort_direction()) {
                ("name", Direction::Ascending)         => select.order(cameras::name.asc()),
                ("name", Direction::Descending)        => select.order(cameras::name.desc()),
                ("mac_address", Direction::Ascending)  => select.order(cameras::mac_address.asc()),
                ("mac_address", Direction::Descending) => select.order(cameras::mac_address.desc()),
                ("site_name", Direction::Ascending)    => select.order(cameras::site_name.asc()),
                ("site_name", Direction::Descending)   => select.order(cameras::site_name.desc()),
                ("model_no", Direction::Ascending)     => select.order(cameras::model_no.asc()),
                ("model_no", Direction::Descending)    => select.order(cameras::model_no.desc()),
                (_, Direction::Descending)             => select.order(cameras::id.desc()),
                (_, Direction::Ascending)              => select.order(cameras::id.asc()),
            };

            trace!("retrieving cameras from database");
            let cameras = select
                .then_order_by(cameras::id.asc())
                .limit(filters.limit())
                .offset(filters.offset())
                .load::<Camera>(conn)?;

            Ok((cameras, total))
        })
    }

    /// Saves changes to this camera, provided nobody else has saved since it was read
    ///
    /// On success the stored version is incremented and `self.version` is
    /// updated to match. If the stored version no longer equals
    /// `self.version`, nothing is written and `Error::EditConflict` is
    /// returned.
    pub fn update(&mut self, conn: &mut SqliteConnection) -> Result<()> {

        debug!("saving camera {} at version {}", self.id, self.version);
        let target = cameras::table
            .filter(cameras::id.eq(self.id))
            .filter(cameras::version.eq(self.version));

        let version = diesel::update(target)
            .set((
                cameras::name.eq(&self.name),
                cameras::mac_address.eq(&self.mac_address),
                cameras::site_name.eq(&self.site_name),
                cameras::model_no.eq(&self.model_no),
                cameras::username.eq(&self.username),
                cameras::password.eq(&self.password),
                cameras::version.eq(cameras::version + 1),
            ))
            .returning(cameras::version)
            .get_result::<i32>(conn)
            .optional()?;

        match version {
            Some(version) => {
                self.version = version;
                Ok(())
            },
            None => {
                debug!("edit conflict on camera {}", self.id);
                Err(Error::EditConflict)
            },
        }
    }

    /// Deletes the specified camera from the database
    pub fn delete(id: i64, conn: &mut SqliteConnection) -> Result<()> {

        if id < 1 {
            return Err(Error::NotFound);
        }

        debug!("deleting camera {}", id);
        let rows = diesel::delete(cameras::table.find(id))
            .execute(conn)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}


fn filtered(query: &CameraQuery) -> cameras::BoxedQuery<'static, Sqlite> {

    let mut select = cameras::table.into_boxed();

    if !query.name.is_empty() {
        select = select.filter(cameras::name.like(contains(&query.name)).escape('\\'));
    }
    if !query.mac_address.is_empty() {
        select = select.filter(cameras::mac_address.like(contains(&query.mac_address)).escape('\\'));
    }
    if !query.model_no.is_empty() {
        select = select.filter(cameras::model_no.like(contains(&query.model_no)).escape('\\'));
    }
    if !query.site_name.is_empty() {
        select = select.filter(cameras::site_name.like(contains(&query.site_name)).escape('\\'));
    }

    select
}


/// Writes a stored UTC timestamp in RFC 3339 form, e.g. `2024-03-02T00:00:00Z`
fn utc_timestamp<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true))
}


/// Builds a LIKE pattern matching `value` anywhere, with wildcards escaped
fn contains(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
