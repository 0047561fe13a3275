use std::path::PathBuf;

use actix_multipart::Multipart;
use actix_web::{get, patch, post, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use serde::Deserialize;

mod files;
mod payloads;
mod store;
use payloads::*;
use store::{PipelineSettings, Store, StoreError};

#[get("/")]
async fn slash() -> impl Responder {
    HttpResponse::Ok().body("docflow stub backend")
}

#[post("/upload")]
async fn upload(ctx: web::Data<SharedCtx>, form: Multipart) -> impl Responder {
    let id = uuidv7::create();
    let saved = files::save_upload(&ctx.upload_dir, &id, ctx.upload_limit, form).await;
    let res = match saved {
        Ok((size, part)) => {
            let filename = part.file_name.unwrap_or_else(|| "upload".to_string());
            let media_type = part
                .media_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            log::debug!("{id}: received {size} bytes");
            ctx.store.insert_upload(&id, &filename, &media_type);
            Ok(UploadResponse {
                video_id: id,
                filename,
            })
        }
        Err(e) => {
            log::warn!("{id}: upload failed: {e}");
            Err(StoreError::BadRequest(e.to_string()))
        }
    };
    res.to_response(HttpResponse::Ok())
}

#[post("/process/{id}")]
async fn process(
    ctx: web::Data<SharedCtx>,
    path: web::Path<String>,
    request: web::Json<ProcessRequest>,
) -> impl Responder {
    ctx.store
        .start_processing(&path.into_inner(), request.into_inner())
        .map(|status| StatusResponse { status })
        .to_response(HttpResponse::Ok())
}

#[get("/status/{id}")]
async fn get_status(ctx: web::Data<SharedCtx>, path: web::Path<String>) -> impl Responder {
    let status = ctx.store.poll_status(&path.into_inner());
    Ok::<_, StoreError>(StatusResponse { status }).to_response(HttpResponse::Ok())
}

#[derive(Deserialize)]
struct PresentationQuery {
    language: Option<String>,
}

#[post("/create-presentation/{id}")]
async fn create_presentation(
    ctx: web::Data<SharedCtx>,
    path: web::Path<String>,
    qs: web::Query<PresentationQuery>,
) -> impl Responder {
    let id = path.into_inner();
    let language = qs.into_inner().language.unwrap_or_else(|| "English".to_string());
    log::info!("{id}: presentation requested in {language}");
    ctx.store
        .create_presentation(&id)
        .map(|()| PresentationResponse {
            presentation_path: format!("output/{id}/presentation.pptx"),
            download_url: format!("/download-presentation/{id}"),
        })
        .to_response(HttpResponse::Ok())
}

#[get("/docs-list/{id}/{dir:.*}")]
async fn list_docs(ctx: web::Data<SharedCtx>, path: web::Path<(String, String)>) -> impl Responder {
    let (id, dir) = path.into_inner();
    ctx.store
        .finished_title(&id)
        .and_then(|title| {
            store::list_directory(&store::documentation(&title), &dir)
                .ok_or(StoreError::NotFound("Directory"))
        })
        .to_response(HttpResponse::Ok())
}

#[get("/docs/{id}/{path:.*}")]
async fn doc_file(ctx: web::Data<SharedCtx>, path: web::Path<(String, String)>) -> impl Responder {
    let (id, file) = path.into_inner();
    let text = ctx.store.finished_title(&id).and_then(|title| {
        store::documentation(&title)
            .into_iter()
            .find(|(p, _)| *p == file.trim_matches('/'))
            .map(|(_, text)| text)
            .ok_or(StoreError::NotFound("File"))
    });
    match text {
        Ok(text) => HttpResponse::Ok()
            .content_type("text/markdown; charset=utf-8")
            .body(text),
        Err(e) => error_response(&e),
    }
}

#[get("/fetch_api/docs-folders")]
async fn docs_folders(ctx: web::Data<SharedCtx>) -> impl Responder {
    Ok::<_, StoreError>(ctx.store.summaries()).to_response(HttpResponse::Ok())
}

#[patch("/api/docs/{id}/update-title")]
async fn update_title(
    ctx: web::Data<SharedCtx>,
    path: web::Path<String>,
    request: web::Json<UpdateTitleRequest>,
) -> impl Responder {
    ctx.store
        .rename(&path.into_inner(), &request.title)
        .map(|()| serde_json::json!({ "message": "Title updated" }))
        .to_response(HttpResponse::Ok())
}

#[get("/download/{id}")]
async fn download(ctx: web::Data<SharedCtx>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match ctx.store.finished_title(&id) {
        Ok(title) => {
            let bundle: String = store::documentation(&title)
                .into_iter()
                .map(|(path, text)| format!("<!-- {path} -->\n{text}\n"))
                .collect();
            HttpResponse::Ok()
                .content_type("application/octet-stream")
                .insert_header(("Content-Disposition", format!("attachment; filename=\"{id}.md\"")))
                .body(bundle)
        }
        Err(e) => error_response(&e),
    }
}

#[get("/download-presentation/{id}")]
async fn download_presentation(ctx: web::Data<SharedCtx>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match ctx.store.has_presentation(&id) {
        Ok(()) => HttpResponse::Ok()
            .content_type("application/octet-stream")
            .insert_header(("Content-Disposition", format!("attachment; filename=\"{id}.pptx\"")))
            .body(format!("stub presentation for {id}\n")),
        Err(e) => error_response(&e),
    }
}

struct SharedCtx {
    store: Store,
    upload_dir: PathBuf,
    upload_limit: u64,
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(slash)
        .service(upload)
        .service(process)
        .service(get_status)
        .service(create_presentation)
        .service(list_docs)
        .service(doc_file)
        .service(docs_folders)
        .service(update_title)
        .service(download)
        .service(download_presentation);
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Status polls spent on each pipeline stage.
    #[arg(long, default_value_t = 1)]
    steps_per_stage: u32,

    /// Make this stage report an error, e.g. `transcribing`.
    #[arg(long)]
    fail_at: Option<String>,

    /// Where uploaded bodies are written.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[arg(long, default_value_t = 2048)]
    max_upload_mb: u64,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    let args = Args::parse();
    let ctx = web::Data::new(SharedCtx {
        store: Store::new(PipelineSettings {
            steps_per_stage: args.steps_per_stage.max(1),
            fail_at: args.fail_at,
        }),
        upload_dir: args.data_dir,
        upload_limit: args.max_upload_mb * 1024 * 1024,
    });
    log::info!("listening on {}", args.bind);
    HttpServer::new(move || App::new().app_data(ctx.clone()).configure(routes))
        .bind(args.bind)?
        .run()
        .await
}
