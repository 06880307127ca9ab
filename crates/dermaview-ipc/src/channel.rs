// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Every channel the renderer may address. Wire names keep the renderer's
/// historical spelling, including the two camelCase auth channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    CheckDbHealth,
    InitializeDatabase,
    CreateUser,
    ListUsers,
    UploadImages,
    ListImages,
    SignIn,
    SignUp,
    ValidatePath,
    FileExists,
    GetImages,
    SelectFolder,
    SelectDownloadFolder,
    FetchDatabaseRoot,
    GetCreationTime,
    GetImageMetadata,
    SearchImagesByCriteria,
    DownloadImage,
    PatientImageDownload,
    PatientImagesDownload,
    UpdateImageInfo,
    SetRepresentativeImage,
    ExportExcel,
    HttpRequest,
    FileUpload,
    LoadSettings,
    UpdateSettings,
    SetAccessToken,
    GetAccessToken,
    ConsoleLog,
    LocalImage,
}

impl Channel {
    pub const ALL: [Self; 31] = [
        Self::CheckDbHealth,
        Self::InitializeDatabase,
        Self::CreateUser,
        Self::ListUsers,
        Self::UploadImages,
        Self::ListImages,
        Self::SignIn,
        Self::SignUp,
        Self::ValidatePath,
        Self::FileExists,
        Self::GetImages,
        Self::SelectFolder,
        Self::SelectDownloadFolder,
        Self::FetchDatabaseRoot,
        Self::GetCreationTime,
        Self::GetImageMetadata,
        Self::SearchImagesByCriteria,
        Self::DownloadImage,
        Self::PatientImageDownload,
        Self::PatientImagesDownload,
        Self::UpdateImageInfo,
        Self::SetRepresentativeImage,
        Self::ExportExcel,
        Self::HttpRequest,
        Self::FileUpload,
        Self::LoadSettings,
        Self::UpdateSettings,
        Self::SetAccessToken,
        Self::GetAccessToken,
        Self::ConsoleLog,
        Self::LocalImage,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckDbHealth => "check-db-health",
            Self::InitializeDatabase => "initialize-database",
            Self::CreateUser => "create-user",
            Self::ListUsers => "list-users",
            Self::UploadImages => "upload-images",
            Self::ListImages => "list-images",
            Self::SignIn => "signIn",
            Self::SignUp => "signUp",
            Self::ValidatePath => "validate-path",
            Self::FileExists => "file-exists",
            Self::GetImages => "get-images",
            Self::SelectFolder => "select-folder",
            Self::SelectDownloadFolder => "select-download-folder",
            Self::FetchDatabaseRoot => "fetch-database-root",
            Self::GetCreationTime => "get-creation-time",
            Self::GetImageMetadata => "get-image-metadata",
            Self::SearchImagesByCriteria => "search-images-by-criteria",
            Self::DownloadImage => "download-image",
            Self::PatientImageDownload => "patient-image-download",
            Self::PatientImagesDownload => "patient-images-download",
            Self::UpdateImageInfo => "update-image-info",
            Self::SetRepresentativeImage => "set-representative-image",
            Self::ExportExcel => "export-excel",
            Self::HttpRequest => "http-request",
            Self::FileUpload => "file-upload",
            Self::LoadSettings => "load-settings",
            Self::UpdateSettings => "update-settings",
            Self::SetAccessToken => "set-access-token",
            Self::GetAccessToken => "get-access-token",
            Self::ConsoleLog => "console-log",
            Self::LocalImage => "local-image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.as_str() == value)
    }

    /// Fire-and-forget channels never produce a reply line, not even on error.
    pub const fn is_fire_and_forget(self) -> bool {
        matches!(self, Self::SetAccessToken | Self::ConsoleLog)
    }
}
