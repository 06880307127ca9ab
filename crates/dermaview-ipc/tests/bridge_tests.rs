// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dermaview_db::Session;
use dermaview_http::Client;
use dermaview_ipc::{Bridge, Dialogs, NotifyLevel, SettingsFile, files, serve};
use dermaview_testkit::ClinicFaker;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tiny_http::{Response, Server};

#[derive(Default)]
struct Script {
    folders: VecDeque<Option<PathBuf>>,
    save_paths: VecDeque<Option<PathBuf>>,
    titles: Vec<String>,
    notifications: Vec<(NotifyLevel, String, String)>,
}

struct ScriptedDialogs(Rc<RefCell<Script>>);

impl Dialogs for ScriptedDialogs {
    fn pick_folder(&mut self, title: &str) -> Result<Option<PathBuf>> {
        let mut script = self.0.borrow_mut();
        script.titles.push(title.to_owned());
        Ok(script.folders.pop_front().flatten())
    }

    fn pick_save_path(&mut self, default_name: &str) -> Result<Option<PathBuf>> {
        let mut script = self.0.borrow_mut();
        script.titles.push(default_name.to_owned());
        Ok(script.save_paths.pop_front().flatten())
    }

    fn notify(&mut self, level: NotifyLevel, title: &str, message: &str) {
        self.0
            .borrow_mut()
            .notifications
            .push((level, title.to_owned(), message.to_owned()));
    }
}

struct Harness {
    bridge: Bridge,
    script: Rc<RefCell<Script>>,
    root: PathBuf,
    downloads: PathBuf,
    _temp: tempfile::TempDir,
}

impl Harness {
    fn new() -> Result<Self> {
        Self::with_api("http://127.0.0.1:1")
    }

    fn with_api(base_url: &str) -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().join("root");
        let downloads = temp.path().join("downloads");
        fs::create_dir_all(&downloads)?;

        let script = Rc::new(RefCell::new(Script::default()));
        let bridge = Bridge::new(
            Session::default(),
            Client::new(base_url, Duration::from_secs(2))?,
            SettingsFile::new(temp.path().join("config").join("settings.json")),
            downloads.clone(),
            Box::new(ScriptedDialogs(Rc::clone(&script))),
        );

        Ok(Self {
            bridge,
            script,
            root,
            downloads,
            _temp: temp,
        })
    }

    fn raw(&mut self, channel: &str, args: Value) -> Option<Value> {
        let line = json!({"id": 7, "channel": channel, "args": args}).to_string();
        self.bridge
            .handle_line(&line)
            .map(|reply| serde_json::to_value(reply).expect("reply serializes"))
    }

    fn call(&mut self, channel: &str, args: Value) -> Result<Value> {
        let reply = self
            .raw(channel, args)
            .ok_or_else(|| anyhow!("{channel} produced no reply"))?;
        assert_eq!(reply["id"], json!(7));
        if reply["ok"] == json!(true) {
            Ok(reply["result"].clone())
        } else {
            Err(anyhow!(
                "{}: {}",
                reply["error"]["kind"].as_str().unwrap_or_default(),
                reply["error"]["message"].as_str().unwrap_or_default()
            ))
        }
    }

    fn error_kind(&mut self, channel: &str, args: Value) -> String {
        let reply = self.raw(channel, args).expect("reply expected");
        assert_eq!(reply["ok"], json!(false), "expected failure: {reply}");
        reply["error"]["kind"]
            .as_str()
            .unwrap_or_default()
            .to_owned()
    }

    fn connect(&mut self) -> Result<()> {
        let root = self.root.to_string_lossy().into_owned();
        self.call("fetch-database-root", json!([root]))?;
        self.call("initialize-database", json!([]))?;
        Ok(())
    }
}

#[test]
fn store_channels_require_a_connection() -> Result<()> {
    let mut harness = Harness::new()?;
    assert_eq!(harness.call("check-db-health", json!([]))?, json!(false));
    assert_eq!(harness.error_kind("list-users", json!([])), "not_connected");
    assert_eq!(harness.error_kind("signIn", json!(["admin", "admin"])), "not_connected");
    Ok(())
}

#[test]
fn fresh_root_creates_database_and_admin_can_sign_in() -> Result<()> {
    let mut harness = Harness::new()?;
    let root = harness.root.to_string_lossy().into_owned();

    let fetched = harness.call("fetch-database-root", json!([root]))?;
    assert_eq!(fetched[0], json!(true));
    let db_path = PathBuf::from(fetched[1].as_str().unwrap_or_default());
    assert_eq!(db_path, harness.root.join("database.db"));

    harness.call("initialize-database", json!([]))?;
    assert_eq!(harness.call("check-db-health", json!([]))?, json!(true));

    let admin = harness.call("signIn", json!(["admin", "admin"]))?;
    assert_eq!(admin["name"], json!("admin"));
    assert_eq!(admin["role"], json!("admin"));
    assert!(admin.get("password").is_none());

    assert_eq!(harness.call("signIn", json!(["admin", "nope"]))?, json!(null));

    let again = harness.call("fetch-database-root", json!([root]))?;
    assert_eq!(again[0], json!(false));
    Ok(())
}

#[test]
fn user_channels_report_conflicts_and_validation() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.connect()?;

    assert_eq!(
        harness.error_kind("create-user", json!(["admin", "root", "pw"])),
        "conflict"
    );
    assert_eq!(
        harness.error_kind("create-user", json!(["owner", "root", "pw"])),
        "validation"
    );
    assert_eq!(harness.error_kind("signUp", json!(["", "pw"])), "validation");
    assert_eq!(harness.error_kind("signUp", json!(["only-name"])), "validation");

    let created = harness.call("create-user", json!(["user", "nurse", "pw"]))?;
    assert!(created["id"].as_i64().unwrap_or_default() > 0);
    harness.call("signUp", json!(["doctor", "pw"]))?;
    assert_eq!(harness.error_kind("signUp", json!(["doctor", "pw"])), "conflict");

    let users = harness.call("list-users", json!([]))?;
    let names = users
        .as_array()
        .map(|users| {
            users
                .iter()
                .filter_map(|user| user["name"].as_str())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    assert_eq!(names, vec!["admin", "nurse", "doctor"]);
    Ok(())
}

#[test]
fn upload_and_search_images() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.connect()?;

    let mut faker = ClinicFaker::new(5);
    let images = faker.clinic_images(3, 2);
    let mut payload = serde_json::to_value(&images)?;
    payload
        .as_array_mut()
        .ok_or_else(|| anyhow!("array"))?
        .push(json!({
            "digest": images[0].digest,
            "patientId": "dup",
            "patientName": "Dup",
            "uploadedAt": "2025-01-01",
            "disease": "x",
            "department": "y"
        }));

    let outcomes = harness.call("upload-images", json!([payload]))?;
    let outcomes = outcomes.as_array().ok_or_else(|| anyhow!("array"))?;
    assert_eq!(outcomes.len(), images.len() + 1);
    assert!(outcomes[..images.len()].iter().all(|o| o["inserted"] == json!(true)));
    assert_eq!(outcomes[images.len()]["inserted"], json!(false));
    assert!(outcomes[images.len()]["error"].is_string());

    let all = harness.call("list-images", json!([]))?;
    assert_eq!(all.as_array().map(Vec::len), Some(images.len()));

    let patient_id = images[0].patient_id.clone();
    let found = harness.call("list-images", json!([patient_id, "patientId"]))?;
    assert!(
        found
            .as_array()
            .is_some_and(|found| found.iter().all(|image| image["patientId"] == json!(patient_id)))
    );

    let invalid = harness.call("list-images", json!(["x", "password"]))?;
    assert_eq!(invalid, json!([]));
    Ok(())
}

#[test]
fn upload_batch_reports_each_element_independently() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.connect()?;

    let image = |digest: &str, uploaded_at: Value| {
        json!({
            "digest": digest,
            "patientId": "00000042",
            "patientName": "Kim",
            "uploadedAt": uploaded_at,
            "disease": "Psoriasis",
            "department": "Dermatology"
        })
    };
    let batch = json!([
        image("a.jpg", json!("2025-03-01T09:30:00.000Z")),
        image("b.jpg", json!(20250301)),
        image("c.jpg", json!("2025/03/01")),
        image("d.jpg", json!("2025-03-01 09:30:00"))
    ]);

    let outcomes = harness.call("upload-images", json!([batch]))?;
    let inserted = outcomes
        .as_array()
        .ok_or_else(|| anyhow!("array"))?
        .iter()
        .map(|outcome| (outcome["digest"].clone(), outcome["inserted"].clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        inserted,
        vec![
            (json!("a.jpg"), json!(true)),
            (json!("b.jpg"), json!(false)),
            (json!("c.jpg"), json!(true)),
            (json!("d.jpg"), json!(true)),
        ]
    );
    assert!(outcomes[1]["error"].is_string());

    let listed = harness.call("list-images", json!([]))?;
    assert_eq!(listed.as_array().map(Vec::len), Some(3));

    let found = harness.call("list-images", json!(["2025-03-01 09:30", "uploadedAt"]))?;
    assert_eq!(found.as_array().map(Vec::len), Some(1));
    assert_eq!(found[0]["digest"], json!("d.jpg"));
    assert_eq!(found[0]["uploadedAt"], json!("2025-03-01 09:30:00"));

    let slashed = harness.call("list-images", json!(["2025/03/01", "uploadedAt"]))?;
    assert_eq!(slashed[0]["digest"], json!("c.jpg"));
    Ok(())
}

#[test]
fn protocol_errors_and_unknown_channels() -> Result<()> {
    let mut harness = Harness::new()?;

    let reply = harness
        .bridge
        .handle_line("{not json")
        .ok_or_else(|| anyhow!("reply expected"))?;
    let reply = serde_json::to_value(reply)?;
    assert_eq!(reply["id"], json!(null));
    assert_eq!(reply["ok"], json!(false));
    assert_eq!(reply["error"]["kind"], json!("protocol"));

    assert_eq!(harness.error_kind("drop-tables", json!([])), "unknown_channel");
    Ok(())
}

#[test]
fn token_channels_and_console_log_are_silent() -> Result<()> {
    let mut harness = Harness::new()?;

    assert!(harness.raw("set-access-token", json!([{"token": "abc123"}])).is_none());
    assert!(harness.raw("console-log", json!(["hello from renderer"])).is_none());
    assert!(harness.raw("set-access-token", json!([42])).is_none());

    assert_eq!(harness.bridge.access_token(), "abc123");
    assert_eq!(
        harness.call("get-access-token", json!([]))?,
        json!({"token": "abc123"})
    );

    harness.raw("set-access-token", json!([{}]));
    assert_eq!(harness.call("get-access-token", json!([]))?, json!({"token": ""}));
    Ok(())
}

#[test]
fn filesystem_probes() -> Result<()> {
    let mut harness = Harness::new()?;
    let folder = harness.downloads.clone();
    let image = folder.join("b.PNG");
    fs::write(&image, b"png")?;
    fs::write(folder.join("a.jpg"), b"jpg")?;
    fs::write(folder.join("notes.txt"), b"txt")?;

    let folder_arg = folder.to_string_lossy().into_owned();
    let image_arg = image.to_string_lossy().into_owned();

    assert_eq!(harness.call("validate-path", json!([folder_arg]))?, json!(true));
    assert_eq!(harness.call("validate-path", json!([image_arg]))?, json!(false));
    assert_eq!(harness.call("validate-path", json!([]))?, json!(false));
    assert_eq!(harness.call("file-exists", json!([image_arg]))?, json!(true));
    assert_eq!(harness.call("file-exists", json!([folder_arg]))?, json!(false));

    let images = harness.call("get-images", json!([folder_arg]))?;
    assert_eq!(
        images,
        json!([
            folder.join("a.jpg").to_string_lossy(),
            folder.join("b.PNG").to_string_lossy()
        ])
    );
    assert_eq!(harness.error_kind("get-images", json!(["/no/such/folder"])), "not_found");

    let created = harness.call("get-creation-time", json!([image_arg]))?;
    assert!(
        created
            .as_str()
            .is_some_and(|text| OffsetDateTime::parse(text, &Rfc3339).is_ok())
    );
    assert_eq!(
        harness.call("get-creation-time", json!(["/no/such/file.jpg"]))?,
        json!("Error")
    );

    let metadata = harness.call("get-image-metadata", json!([image_arg]))?;
    assert_eq!(metadata["size"], json!(3));
    let missing = harness.call("get-image-metadata", json!(["/no/such/file.jpg"]))?;
    assert_eq!(missing["size"], json!(0));
    assert!(missing["creationTime"].is_string());
    Ok(())
}

#[test]
fn update_settings_connects_and_enables_criteria_search() -> Result<()> {
    let mut harness = Harness::new()?;
    assert_eq!(harness.call("load-settings", json!([]))?, json!({}));
    assert_eq!(harness.call("search-images-by-criteria", json!(["등록번호", "1"]))?, json!([]));

    let root = harness.root.clone();
    let uploads = files::upload_dir(&root);
    fs::create_dir_all(&uploads)?;
    fs::write(uploads.join("10023_face.jpg"), b"x")?;
    fs::write(uploads.join("20077_hand.png"), b"x")?;

    let settings = json!({"rootDirPath": root.to_string_lossy(), "theme": "dark"});
    assert_eq!(harness.call("update-settings", json!([settings]))?, json!(null));
    assert_eq!(harness.call("load-settings", json!([]))?, settings);
    assert_eq!(harness.call("check-db-health", json!([]))?, json!(true));
    assert!(harness.call("signIn", json!(["admin", "admin"]))?.is_object());

    let by_number = harness.call("search-images-by-criteria", json!(["등록번호", "100"]))?;
    assert_eq!(
        by_number,
        json!([uploads.join("10023_face.jpg").to_string_lossy()])
    );
    let everything = harness.call("search-images-by-criteria", json!(["날짜", ""]))?;
    assert_eq!(everything.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn download_channels_copy_files() -> Result<()> {
    let mut harness = Harness::new()?;
    let source_dir = harness.root.join("src");
    fs::create_dir_all(&source_dir)?;
    let source = source_dir.join("lesion.jpg");
    fs::write(&source, b"jpeg")?;
    let target = harness.downloads.clone();

    let copied = harness.call(
        "download-image",
        json!([{
            "sourcePath": source.to_string_lossy(),
            "targetDir": target.to_string_lossy(),
            "fileName": "copy.jpg"
        }]),
    )?;
    assert_eq!(copied["success"], json!(true));
    assert_eq!(fs::read(target.join("copy.jpg"))?, b"jpeg");

    assert_eq!(
        harness.error_kind(
            "download-image",
            json!([{
                "sourcePath": source_dir.join("missing.jpg").to_string_lossy(),
                "targetDir": target.to_string_lossy(),
                "fileName": "x.jpg"
            }])
        ),
        "not_found"
    );

    harness.script.borrow_mut().folders.push_back(None);
    let cancelled = harness.call(
        "patient-image-download",
        json!([{"imagePath": source.to_string_lossy()}]),
    )?;
    assert_eq!(cancelled, json!({"cancelled": true}));

    harness
        .script
        .borrow_mut()
        .folders
        .push_back(Some(target.clone()));
    let single = harness.call(
        "patient-image-download",
        json!([{"imagePath": source.to_string_lossy()}]),
    )?;
    assert_eq!(single["success"], json!(true));
    assert!(target.join("lesion.jpg").is_file());

    let missing_path = harness.call("patient-image-download", json!([{}]))?;
    assert_eq!(missing_path["error"], json!(true));

    harness
        .script
        .borrow_mut()
        .folders
        .push_back(Some(target.clone()));
    let bundle = harness.call(
        "patient-images-download",
        json!([{
            "date": "2025-03-01",
            "patientName": "Kim Minjun",
            "images": [
                {"imgPath": source.to_string_lossy()},
                {"imgPath": source.to_string_lossy(), "fileName": "second.jpg"}
            ]
        }]),
    )?;
    assert_eq!(bundle["success"], json!(true));
    assert_eq!(bundle["count"], json!(2));
    let folder = target.join("Kim Minjun_2025-03-01");
    assert!(folder.join("lesion.jpg").is_file());
    assert!(folder.join("second.jpg").is_file());
    Ok(())
}

#[test]
fn export_excel_flows() -> Result<()> {
    let mut harness = Harness::new()?;
    let rows = json!([
        {"name": "Kim", "visits": 3, "last": null},
        {"name": "Lee", "visits": 1, "last": "NaN"}
    ]);

    let empty = harness.call("export-excel", json!([{"data": []}]))?;
    assert_eq!(empty["error"], json!(true));

    harness.script.borrow_mut().save_paths.push_back(None);
    let cancelled = harness.call("export-excel", json!([{"data": rows}]))?;
    assert_eq!(cancelled, json!({"cancelled": true}));
    let proposed = harness.script.borrow().titles.last().cloned().unwrap_or_default();
    assert!(proposed.starts_with("patient-list_") && proposed.ends_with(".xlsx"));

    let csv_target = harness.downloads.join("chosen.csv");
    harness
        .script
        .borrow_mut()
        .save_paths
        .push_back(Some(csv_target.clone()));
    let csv = harness.call("export-excel", json!([{"data": rows}]))?;
    assert_eq!(csv["success"], json!(true));
    assert_eq!(csv["format"], json!("csv"));
    assert!(csv.get("recovered").is_none());
    assert_eq!(
        fs::read_to_string(&csv_target)?,
        "name,visits,last\n\"Kim\",3,\"-\"\n\"Lee\",1,\"-\""
    );

    let unwritable = harness.root.join("missing").join("patients.xlsx");
    harness
        .script
        .borrow_mut()
        .save_paths
        .push_back(Some(unwritable));
    let recovered = harness.call("export-excel", json!([{"data": rows}]))?;
    assert_eq!(recovered["recovered"], json!(true));
    let recovered_path = PathBuf::from(recovered["path"].as_str().unwrap_or_default());
    assert_eq!(recovered_path.parent(), Some(harness.downloads.as_path()));
    assert!(recovered_path.is_file());

    let notifications = harness.script.borrow().notifications.clone();
    let levels = notifications
        .iter()
        .map(|(level, _, _)| *level)
        .collect::<Vec<_>>();
    assert_eq!(
        levels,
        vec![NotifyLevel::Error, NotifyLevel::Info, NotifyLevel::Info]
    );
    Ok(())
}

#[test]
fn local_image_returns_base64_or_placeholder() -> Result<()> {
    let mut harness = Harness::new()?;
    let image = harness.downloads.join("photo.png");
    fs::write(&image, b"\x89PNG")?;

    let url = format!("local-image://{}", image.display());
    let served = harness.call("local-image", json!([url]))?;
    assert_eq!(served["contentType"], json!("image/png"));
    assert_eq!(
        STANDARD.decode(served["data"].as_str().unwrap_or_default())?,
        b"\x89PNG"
    );

    let missing = harness.call("local-image", json!(["local-image:///no/such/file.jpg"]))?;
    assert_eq!(missing["contentType"], json!("image/gif"));
    assert_eq!(
        STANDARD.decode(missing["data"].as_str().unwrap_or_default())?,
        files::FALLBACK_GIF
    );
    Ok(())
}

#[test]
fn representative_image_is_validated_locally() -> Result<()> {
    let mut harness = Harness::new()?;

    let missing_ids = harness.call("set-representative-image", json!([{"imageId": 4}]))?;
    assert_eq!(missing_ids["error"], json!(true));

    let missing_token = harness.call(
        "set-representative-image",
        json!([{"patientInfoId": 1, "imageId": 4}]),
    )?;
    assert!(
        missing_token["message"]
            .as_str()
            .is_some_and(|message| message.contains("access token missing"))
    );

    let accepted = harness.call(
        "set-representative-image",
        json!([{"patientInfoId": 1, "imageId": 4, "token": "t"}]),
    )?;
    assert_eq!(accepted["success"], json!(true));
    Ok(())
}

#[test]
fn update_image_info_without_token_is_an_error_envelope() -> Result<()> {
    let mut harness = Harness::new()?;
    let reply = harness.call("update-image-info", json!([{"imgId": 9}]))?;
    assert_eq!(reply["error"], json!(true));
    assert!(
        reply["message"]
            .as_str()
            .is_some_and(|message| message.contains("access token missing"))
    );
    Ok(())
}

fn header(request: &tiny_http::Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.to_string().eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str().to_owned())
}

#[test]
fn proxy_channels_use_the_bridge_token() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("proxy request expected");
        assert_eq!(request.url(), "/api/patients?page=1");
        request
            .respond(Response::from_string(r#"{"total":2}"#).with_status_code(200))
            .expect("response should succeed");

        let mut upload = server.recv().expect("upload request expected");
        assert_eq!(
            header(&upload, "Authorization").as_deref(),
            Some("Bearer bridge-token")
        );
        let mut body = String::new();
        upload
            .as_reader()
            .read_to_string(&mut body)
            .expect("body readable");
        assert!(body.contains("name=\"user_id\""));
        upload
            .respond(Response::from_string("denied").with_status_code(403))
            .expect("response should succeed");
    });

    let mut harness = Harness::with_api(&addr)?;
    let proxied = harness.call(
        "http-request",
        json!([{"url": "/patients", "baseURL": format!("{addr}/api"), "params": {"page": 1}}]),
    )?;
    assert_eq!(proxied["status"], json!(200));
    assert_eq!(proxied["data"], json!({"total": 2}));

    let file = harness.downloads.join("scan.jpg");
    fs::write(&file, b"jpeg")?;
    harness.raw("set-access-token", json!([{"token": "bridge-token"}]));
    let uploaded = harness.call(
        "file-upload",
        json!([{
            "url": format!("{addr}/file/upload"),
            "files": [{"path": file.to_string_lossy(), "name": "scan.jpg"}],
            "token": "ignored-request-token"
        }]),
    )?;
    assert_eq!(uploaded["error"], json!(true));
    assert_eq!(uploaded["status"], json!(403));
    assert_eq!(uploaded["data"], json!("denied"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn serve_writes_one_line_per_answered_request() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let script = Rc::new(RefCell::new(Script::default()));
    let mut bridge = Bridge::new(
        Session::default(),
        Client::new("http://127.0.0.1:1", Duration::from_millis(200))?,
        SettingsFile::new(temp.path().join("settings.json")),
        temp.path().to_path_buf(),
        Box::new(ScriptedDialogs(script)),
    );

    let input = concat!(
        "{\"id\":1,\"channel\":\"check-db-health\"}\n",
        "\n",
        "{\"channel\":\"console-log\",\"args\":[\"hi\"]}\n",
        "{\"id\":2,\"channel\":\"set-access-token\",\"args\":[{\"token\":\"t\"}]}\n",
        "{\"id\":3,\"channel\":\"get-access-token\"}\n",
    );
    let mut output = Vec::new();
    serve(Cursor::new(input), &mut output, &mut bridge)?;

    let lines = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str::<Value>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    assert_eq!(
        lines,
        vec![
            json!({"id": 1, "ok": true, "result": false}),
            json!({"id": 3, "ok": true, "result": {"token": "t"}}),
        ]
    );
    Ok(())
}

#[test]
fn session_can_be_attached_for_demo_stores() -> Result<()> {
    let mut harness = Harness::new()?;
    let store = dermaview_db::Store::open_memory()?;
    store.ensure_schema()?;
    harness.bridge.session_mut().attach(store)?;
    assert_eq!(harness.call("check-db-health", json!([]))?, json!(true));
    assert!(harness.bridge.session().path().is_none());
    Ok(())
}
