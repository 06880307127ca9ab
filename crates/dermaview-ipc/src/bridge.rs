// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dermaview_app::timestamp::format_rfc3339;
use dermaview_app::{Image, Role, UploadOutcome};
use dermaview_db::Session;
use dermaview_http::{
    Client, ImageInfoUpdate, ProxyRequest, UploadRequest, resolve_token, token_prefix,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::channel::Channel;
use crate::dialogs::{Dialogs, NotifyLevel};
use crate::error::{IpcError, IpcResult};
use crate::export::{self, ExportRequest};
use crate::files;
use crate::protocol::{Args, Reply, Request};
use crate::settings::{SettingsFile, root_dir_of};

const ROOT_FOLDER_TITLE: &str = "Select the dermaview root folder";
const DOWNLOAD_FOLDER_TITLE: &str = "Select a download folder";
const SAVE_IMAGE_TITLE: &str = "Select where to save the image";
const SAVE_IMAGES_TITLE: &str = "Select where to save the patient images";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadImageRequest {
    source_path: PathBuf,
    target_dir: PathBuf,
    file_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientImageRequest {
    #[serde(default)]
    image_path: Option<PathBuf>,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientImagesRequest {
    #[serde(default)]
    date: String,
    #[serde(default)]
    images: Vec<PatientImageEntry>,
    #[serde(default)]
    patient_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientImageEntry {
    img_path: PathBuf,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepresentativeImageRequest {
    #[serde(default)]
    patient_info_id: Value,
    #[serde(default)]
    image_id: Value,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenPayload {
    #[serde(default)]
    token: Option<String>,
}

/// Owns everything the renderer can reach: the store session, the outbound
/// HTTP client, the settings file, the access token and the host dialogs.
pub struct Bridge {
    session: Session,
    http: Client,
    settings: SettingsFile,
    downloads_dir: PathBuf,
    dialogs: Box<dyn Dialogs>,
    access_token: String,
}

impl Bridge {
    pub fn new(
        session: Session,
        http: Client,
        settings: SettingsFile,
        downloads_dir: PathBuf,
        dialogs: Box<dyn Dialogs>,
    ) -> Self {
        Self {
            session,
            http,
            settings,
            downloads_dir,
            dialogs,
            access_token: String::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn settings(&self) -> &SettingsFile {
        &self.settings
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Parses and handles one wire line. `None` means nothing is written back.
    pub fn handle_line(&mut self, line: &str) -> Option<Reply> {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(error) => {
                warn!(%error, "malformed request line");
                Some(Reply::failure(
                    None,
                    &IpcError::Protocol(format!("malformed request: {error}")),
                ))
            }
        }
    }

    pub fn handle(&mut self, request: Request) -> Option<Reply> {
        let Some(channel) = Channel::parse(&request.channel) else {
            warn!(channel = %request.channel, "unknown channel");
            return Some(Reply::failure(
                request.id,
                &IpcError::UnknownChannel(request.channel),
            ));
        };

        debug!(channel = channel.as_str(), id = ?request.id, "handling request");
        let outcome = self.dispatch(channel, &Args::new(channel, &request.args));
        match outcome {
            Ok(_) if channel.is_fire_and_forget() => None,
            Ok(result) => Some(Reply::success(request.id, result)),
            Err(error) if channel.is_fire_and_forget() => {
                warn!(channel = channel.as_str(), %error, "fire-and-forget request failed");
                None
            }
            Err(error) => {
                warn!(
                    channel = channel.as_str(),
                    kind = error.kind(),
                    %error,
                    "request failed"
                );
                Some(Reply::failure(request.id, &error))
            }
        }
    }

    fn dispatch(&mut self, channel: Channel, args: &Args<'_>) -> IpcResult<Value> {
        match channel {
            Channel::CheckDbHealth => Ok(json!(self.session.health_check())),
            Channel::InitializeDatabase => {
                self.session.store()?.ensure_schema()?;
                Ok(Value::Null)
            }
            Channel::CreateUser => self.create_user(args),
            Channel::ListUsers => to_json(&self.session.store()?.list_users()?),
            Channel::UploadImages => self.upload_images(args),
            Channel::ListImages => {
                let query: Option<String> = args.optional(0, "query")?;
                let field: Option<String> = args.optional(1, "field")?;
                let images = self.session.store()?.search_images(
                    query.as_deref().unwrap_or_default(),
                    field.as_deref().unwrap_or_default(),
                )?;
                to_json(&images)
            }
            Channel::SignIn => {
                let name: String = args.required(0, "name")?;
                let password: String = args.required(1, "password")?;
                to_json(&self.session.store()?.sign_in(&name, &password)?)
            }
            Channel::SignUp => {
                let name: String = args.required(0, "name")?;
                let password: String = args.required(1, "password")?;
                let id = self.session.store()?.sign_up(&name, &password)?;
                Ok(json!({ "id": id }))
            }
            Channel::ValidatePath => Ok(json!(
                path_arg(args).is_some_and(|path| files::validate_path(&path))
            )),
            Channel::FileExists => Ok(json!(
                path_arg(args).is_some_and(|path| files::file_exists(&path))
            )),
            Channel::GetImages => {
                let folder: PathBuf = args.required(0, "folder")?;
                to_json(&files::list_images(&folder)?)
            }
            Channel::SelectFolder => to_json(&self.dialogs.pick_folder(ROOT_FOLDER_TITLE)?),
            Channel::SelectDownloadFolder => {
                to_json(&self.dialogs.pick_folder(DOWNLOAD_FOLDER_TITLE)?)
            }
            Channel::FetchDatabaseRoot => {
                let root: PathBuf = args.required(0, "rootDir")?;
                let (is_new, db_path) = self.session.fetch_database_root(&root)?;
                Ok(json!([is_new, db_path.to_string_lossy()]))
            }
            Channel::GetCreationTime => Ok(json!(self.creation_time(args))),
            Channel::GetImageMetadata => self.image_metadata(args),
            Channel::SearchImagesByCriteria => Ok(json!(self.search_by_criteria(args))),
            Channel::DownloadImage => {
                let request: DownloadImageRequest = args.required(0, "options")?;
                let path =
                    files::copy_into(&request.source_path, &request.target_dir, &request.file_name)?;
                info!(path = %path.display(), "image downloaded");
                Ok(json!({ "success": true, "path": path.to_string_lossy() }))
            }
            Channel::PatientImageDownload => self.patient_image_download(args),
            Channel::PatientImagesDownload => self.patient_images_download(args),
            Channel::UpdateImageInfo => self.update_image_info(args),
            Channel::SetRepresentativeImage => self.set_representative_image(args),
            Channel::ExportExcel => self.export_excel(args),
            Channel::HttpRequest => {
                let request: ProxyRequest = args.required(0, "options")?;
                to_json(&self.http.send(&request))
            }
            Channel::FileUpload => {
                let request: UploadRequest = args.required(0, "options")?;
                let token = resolve_token(&self.access_token, request.token.as_deref());
                let response = self.http.upload_files(&request, token);
                debug!(
                    status = ?response.status(),
                    success = response.is_success(),
                    "file upload proxied"
                );
                to_json(&response)
            }
            Channel::LoadSettings => Ok(self.settings.load()?),
            Channel::UpdateSettings => self.update_settings(args),
            Channel::SetAccessToken => {
                let payload: TokenPayload = args.optional(0, "data")?.unwrap_or_default();
                self.access_token = payload.token.unwrap_or_default();
                if self.access_token.is_empty() {
                    info!("access token cleared");
                } else {
                    info!(token = %token_prefix(&self.access_token), "access token set");
                }
                Ok(Value::Null)
            }
            Channel::GetAccessToken => Ok(json!({ "token": self.access_token })),
            Channel::ConsoleLog => {
                let message = match args.raw(0) {
                    Some(Value::String(text)) => text.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                info!(target: "renderer", "{message}");
                Ok(Value::Null)
            }
            Channel::LocalImage => {
                let url: String = args.required(0, "url")?;
                let image = files::resolve_local_image(&url);
                Ok(json!({
                    "contentType": image.content_type,
                    "data": STANDARD.encode(&image.bytes),
                }))
            }
        }
    }

    /// Elements are decoded one at a time; a malformed element fails only its
    /// own outcome.
    fn upload_images(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let entries: Vec<Value> = args.required(0, "images")?;
        let decoded = entries
            .into_iter()
            .map(|entry| {
                let digest = entry
                    .get("digest")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                serde_json::from_value::<Image>(entry).map_err(|error| {
                    warn!(%digest, %error, "malformed image in upload batch");
                    UploadOutcome::failed(&digest, format!("invalid image: {error}"))
                })
            })
            .collect::<Vec<_>>();

        let images = decoded
            .iter()
            .filter_map(|result| result.as_ref().ok().cloned())
            .collect::<Vec<_>>();
        let mut stored = self.session.store()?.upload_images(&images)?.into_iter();
        let outcomes = decoded
            .into_iter()
            .map(|result| match result {
                Ok(image) => stored
                    .next()
                    .unwrap_or_else(|| UploadOutcome::failed(&image.digest, "image was not stored")),
                Err(outcome) => outcome,
            })
            .collect::<Vec<_>>();
        to_json(&outcomes)
    }

    fn create_user(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let role: String = args.required(0, "role")?;
        let name: String = args.required(1, "name")?;
        let password: String = args.required(2, "password")?;
        let role = Role::parse(&role).ok_or_else(|| {
            IpcError::Validation(format!("unknown role {role:?} -- use admin or user"))
        })?;
        let id = self.session.store()?.create_user(role, &name, &password)?;
        Ok(json!({ "id": id }))
    }

    fn creation_time(&self, args: &Args<'_>) -> String {
        let formatted = path_arg(args)
            .context("get-creation-time requires a path")
            .and_then(|path| files::creation_time(&path))
            .and_then(format_rfc3339);
        formatted.unwrap_or_else(|error| {
            error!(error = %format!("{error:#}"), "read creation time");
            "Error".to_owned()
        })
    }

    fn image_metadata(&self, args: &Args<'_>) -> IpcResult<Value> {
        let metadata = path_arg(args)
            .context("get-image-metadata requires a path")
            .and_then(|path| files::image_metadata(&path));
        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "image metadata unavailable");
                files::unknown_image_metadata()?
            }
        };
        to_json(&metadata)
    }

    fn search_by_criteria(&self, args: &Args<'_>) -> Vec<PathBuf> {
        let field = args
            .optional::<String>(0, "field")
            .ok()
            .flatten()
            .unwrap_or_default();
        let query = args
            .optional::<String>(1, "query")
            .ok()
            .flatten()
            .unwrap_or_default();

        let root = match self.settings.root_dir() {
            Ok(Some(root)) => root,
            Ok(None) => {
                error!("criteria search without rootDirPath in settings");
                return Vec::new();
            }
            Err(error) => {
                error!(error = %format!("{error:#}"), "criteria search could not read settings");
                return Vec::new();
            }
        };

        files::search_by_criteria(&root, &field, &query).unwrap_or_else(|error| {
            error!(%error, "criteria search failed");
            Vec::new()
        })
    }

    fn patient_image_download(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let request: PatientImageRequest = args.optional(0, "options")?.unwrap_or_default();
        let Some(image_path) = request.image_path.filter(|path| !path.as_os_str().is_empty())
        else {
            return Ok(failure_value("no image path given -- choose an image to download"));
        };

        let Some(target_dir) = self.dialogs.pick_folder(SAVE_IMAGE_TITLE)? else {
            info!("patient image download cancelled");
            return Ok(json!({ "cancelled": true }));
        };

        let file_name = request
            .file_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| files::file_name_of(&image_path))
            .unwrap_or_default();
        match files::copy_into(&image_path, &target_dir, &file_name) {
            Ok(path) => {
                info!(path = %path.display(), "patient image downloaded");
                Ok(json!({ "success": true, "path": path.to_string_lossy() }))
            }
            Err(error) => {
                warn!(%error, "patient image download failed");
                Ok(failure_value(error.to_string()))
            }
        }
    }

    fn patient_images_download(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let request: PatientImagesRequest = args.optional(0, "options")?.unwrap_or_default();
        if request.images.is_empty() {
            return Ok(failure_value("no images given -- select images to download"));
        }

        let Some(target_dir) = self.dialogs.pick_folder(SAVE_IMAGES_TITLE)? else {
            info!("patient images download cancelled");
            return Ok(json!({ "cancelled": true }));
        };

        let folder = target_dir.join(bundle_folder_name(&request.patient_name, &request.date));
        match copy_bundle(&request.images, &folder) {
            Ok(count) => {
                info!(path = %folder.display(), count, "patient images downloaded");
                Ok(json!({
                    "success": true,
                    "path": folder.to_string_lossy(),
                    "count": count,
                }))
            }
            Err(error) => {
                warn!(%error, "patient images download failed");
                Ok(failure_value(error.to_string()))
            }
        }
    }

    fn update_image_info(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let update: ImageInfoUpdate = args.required(0, "options")?;
        let token = resolve_token(&self.access_token, update.token.as_deref());
        match self.http.update_image_info(&update, token) {
            Ok(reply) => to_json(&reply),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "image info update failed");
                Ok(failure_value(format!("{error:#}")))
            }
        }
    }

    /// The backend has no endpoint for this yet; inputs are validated and the
    /// renderer is told it succeeded.
    fn set_representative_image(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let request: RepresentativeImageRequest = args.optional(0, "options")?.unwrap_or_default();
        if is_blank(&request.patient_info_id) || is_blank(&request.image_id) {
            return Ok(failure_value(
                "patient id or image id missing -- select a patient image first",
            ));
        }
        if resolve_token(&self.access_token, request.token.as_deref()).is_none() {
            return Ok(failure_value(dermaview_http::MISSING_TOKEN_MESSAGE));
        }

        info!(
            patient = %request.patient_info_id,
            image = %request.image_id,
            "representative image set"
        );
        Ok(json!({ "success": true, "message": "representative image updated" }))
    }

    fn export_excel(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let request: ExportRequest = args.optional(0, "options")?.unwrap_or_default();
        let today = OffsetDateTime::now_utc().date();

        let rows = match export::clean_rows(&request.data) {
            Ok(rows) => rows,
            Err(error) => {
                self.dialogs
                    .notify(NotifyLevel::Error, "Export failed", &error.to_string());
                return Ok(failure_value(error.to_string()));
            }
        };

        let default_name = export::default_file_name(today, "xlsx")?;
        let Some(target) = self.dialogs.pick_save_path(&default_name)? else {
            info!("export cancelled");
            return Ok(json!({ "cancelled": true }));
        };

        match export::export_rows(&rows, &target, &self.downloads_dir, today) {
            Ok(report) => {
                let (title, message) = if report.recovered {
                    (
                        "Export saved as CSV",
                        format!(
                            "The chosen format could not be written; the patient list was saved as CSV.\nPath: {}",
                            report.path.display()
                        ),
                    )
                } else {
                    (
                        "Export complete",
                        format!("Patient list saved.\nPath: {}", report.path.display()),
                    )
                };
                self.dialogs.notify(NotifyLevel::Info, title, &message);
                to_json(&report)
            }
            Err(error) => {
                let message = format!("{error:#}");
                error!(error = %message, "export failed");
                self.dialogs
                    .notify(NotifyLevel::Error, "Export failed", &message);
                Ok(failure_value(message))
            }
        }
    }

    fn update_settings(&mut self, args: &Args<'_>) -> IpcResult<Value> {
        let settings: Value = args.required(0, "settings")?;
        self.settings.save(&settings)?;
        info!(path = %self.settings.path().display(), "settings updated");

        if let Some(root) = root_dir_of(&settings) {
            self.session.fetch_database_root(&root)?;
            self.session.store()?.ensure_schema()?;
        }
        Ok(Value::Null)
    }
}

fn path_arg(args: &Args<'_>) -> Option<PathBuf> {
    args.optional::<PathBuf>(0, "path")
        .ok()
        .flatten()
        .filter(|path| !path.as_os_str().is_empty())
}

fn bundle_folder_name(patient_name: &str, date: &str) -> String {
    let raw = format!("{}_{}", patient_name.trim(), date.trim());
    raw.chars()
        .map(|ch| if matches!(ch, '/' | '\\') { '_' } else { ch })
        .collect()
}

fn copy_bundle(images: &[PatientImageEntry], folder: &Path) -> IpcResult<usize> {
    fs::create_dir_all(folder)
        .map_err(|error| IpcError::io(format!("create folder {}", folder.display()), error))?;

    for image in images {
        let file_name = image
            .file_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| files::file_name_of(&image.img_path))
            .ok_or_else(|| {
                IpcError::Validation(format!(
                    "image path {} has no file name",
                    image.img_path.display()
                ))
            })?;
        files::copy_into(&image.img_path, folder, &file_name)?;
    }
    Ok(images.len())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn failure_value(message: impl Into<String>) -> Value {
    json!({ "error": true, "message": message.into() })
}

fn to_json<T: serde::Serialize>(value: &T) -> IpcResult<Value> {
    serde_json::to_value(value)
        .context("encode reply")
        .map_err(IpcError::from)
}
