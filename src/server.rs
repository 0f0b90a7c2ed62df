use std::io::Result;

use actix_cors::Cors;
use actix_web::{
    middleware::Logger,
    web::{self, resource, scope, Data, Json, Path, Query, ServiceConfig},
    App, HttpResponse, HttpServer,
};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    auth::check_auth,
    core::{
        chain::SourceChain,
        color::{text_color_for, ColorCache},
        data::{bake, load_snapshot},
        settings::Settings,
        store::ProjectStore,
    },
    types::{next_after, Language, Project, ProjectDetail},
    Error,
};

#[derive(Deserialize, Debug)]
pub struct ProjectsQuery {
    #[serde(default)]
    pub lang: Language,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Deserialize, Debug)]
pub struct ColorQuery {
    pub image: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ColorEntry {
    pub image: String,
    pub color: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ColorResponse {
    pub image: String,
    pub color: String,
    pub text_color: String,
}

pub async fn start_server(settings: Settings) -> Result<()> {
    let addr = settings.addr();
    let store = Data::new(ProjectStore::new(settings.cache_ttl()));
    let colors = Data::new(ColorCache::new());
    let settings = Data::new(settings);
    info!("Serving projects at http://{}/v1/projects", addr);
    HttpServer::new(move || {
        // awc clients are tied to the worker's runtime, so each worker gets its own chain.
        let chain = Data::new(SourceChain::from_settings(&settings));
        App::new()
            .app_data(chain)
            .app_data(store.clone())
            .app_data(colors.clone())
            .app_data(settings.clone())
            .configure(routes)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_header()
                    .allow_any_method(),
            )
            .wrap(Logger::default())
    })
    .bind(&addr)?
    .run()
    .await
}

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/v1")
            .service(resource("/projects").route(web::get().to(projects_handler)))
            .service(resource("/projects/{id}").route(web::get().to(project_handler)))
            .service(
                resource("/colors")
                    .route(web::get().to(get_color_handler))
                    .route(web::put().to(put_color_handler)),
            )
            .service(resource("/bake").route(web::post().to(bake_handler)))
            .service(resource("/folio").route(web::get().to(status_handler))),
    );
}

/// Cached list when fresh, otherwise one pass over the chain.
async fn resolve(
    lang: Language,
    refresh: bool,
    chain: &SourceChain,
    store: &ProjectStore,
) -> Vec<Project> {
    if !refresh {
        if let Some(projects) = store.fresh(lang) {
            return projects;
        }
    }
    let ticket = store.begin(lang);
    let projects = chain.load_projects(lang).await;
    if store.commit(ticket, projects.clone()) {
        projects
    } else {
        store.fresh(lang).unwrap_or(projects)
    }
}

async fn projects_handler(
    query: Query<ProjectsQuery>,
    chain: Data<SourceChain>,
    store: Data<ProjectStore>,
) -> HttpResponse {
    let projects = resolve(query.lang, query.refresh, &chain, &store).await;
    HttpResponse::Ok().json(projects)
}

async fn project_handler(
    id: Path<u64>,
    query: Query<ProjectsQuery>,
    chain: Data<SourceChain>,
    store: Data<ProjectStore>,
) -> HttpResponse {
    let id = id.into_inner();
    let projects = resolve(query.lang, query.refresh, &chain, &store).await;
    match projects.iter().find(|project| project.id == id) {
        Some(project) => HttpResponse::Ok().json(ProjectDetail {
            project: project.clone(),
            next: next_after(&projects, id).cloned(),
        }),
        None => HttpResponse::NotFound().body(format!("No project {}", id)),
    }
}

async fn get_color_handler(query: Query<ColorQuery>, colors: Data<ColorCache>) -> HttpResponse {
    match colors.get(&query.image) {
        Some(color) => HttpResponse::Ok().json(ColorResponse {
            image: query.image.clone(),
            text_color: text_color_for(&color).to_string(),
            color,
        }),
        None => HttpResponse::NotFound().body("No color cached for this image."),
    }
}

async fn put_color_handler(entry: Json<ColorEntry>, colors: Data<ColorCache>) -> HttpResponse {
    if colors.save(&entry.image, &entry.color) {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::BadRequest().body("Expected an image URL and a #rrggbb color.")
    }
}

async fn bake_handler(
    remote_key: BearerAuth,
    chain: Data<SourceChain>,
    store: Data<ProjectStore>,
    settings: Data<Settings>,
) -> HttpResponse {
    if check_auth(remote_key.token(), &settings.key_path()).is_err() {
        return HttpResponse::Unauthorized().body("Unauthorized token.");
    }
    match bake(&chain, &settings.snapshot_path()).await {
        Ok(snapshot) => {
            store.invalidate();
            HttpResponse::Ok().body(format!("Baked {} projects", snapshot.projects.len()))
        }
        Err(Error::NothingToBake) => {
            HttpResponse::BadGateway().body("No remote source returned projects.")
        }
        Err(err) => {
            error!("Bake failed: {}", err);
            HttpResponse::InternalServerError().body("Failed to write the projects snapshot.")
        }
    }
}

async fn status_handler(settings: Data<Settings>, colors: Data<ColorCache>) -> HttpResponse {
    let snapshot = match load_snapshot(&settings.snapshot_path()) {
        Ok(snapshot) => format!(
            "snapshot of {} projects from {}",
            snapshot.projects.len(),
            snapshot.generated_at.to_rfc3339()
        ),
        Err(_) => "no snapshot".to_string(),
    };
    let cached = if colors.is_empty() {
        "no cached colors".to_string()
    } else {
        format!("{} cached colors", colors.len())
    };
    HttpResponse::Ok().body(format!("folio-content is running ({}, {})", snapshot, cached))
}
