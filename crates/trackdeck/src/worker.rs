//! Background worker that owns all blocking HTTP calls.
//!
//! The UI thread pushes jobs onto a channel and keeps drawing; results come
//! back as events pumped in the UI loop. List queries carry the query
//! controller's sequence number so stale pages can be dropped on the other
//! side.

use std::fs;
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};
use trackdeck_types::{BulkDeleteResult, Track, TrackInput};

use crate::query::{QueryReq, QueryResp};
use crate::server_api;

#[derive(Clone, Debug)]
pub(crate) enum Job {
    List(QueryReq),
    Get { id: String },
    Genres,
    Artists,
    Create(TrackInput),
    Update { id: String, input: TrackInput },
    Delete { id: String },
    BulkDelete { ids: Vec<String> },
    Upload {
        id: String,
        path: PathBuf,
        file_name: String,
        mime: &'static str,
    },
    RemoveAudio { id: String },
}

#[derive(Clone, Debug)]
pub(crate) enum ApiEvent {
    Page(QueryResp),
    /// Fresh single-track snapshot, fetched before the edit form opens.
    Fetched(Result<Track, String>),
    Genres(Result<Vec<String>, String>),
    Artists(Result<Vec<String>, String>),
    Created(Result<Track, String>),
    Updated(Result<Track, String>),
    Deleted(Result<(), String>),
    BulkDeleted(Result<BulkDeleteResult, String>),
    Uploaded(Result<Track, String>),
    AudioRemoved(Result<Track, String>),
}

fn flat(err: anyhow::Error) -> String {
    format!("{err:#}")
}

/// Worker thread entry point. Exits when the job channel closes.
pub(crate) fn worker_main(server: String, job_rx: Receiver<Job>, evt_tx: Sender<ApiEvent>) {
    while let Ok(job) = job_rx.recv() {
        let event = match job {
            Job::List(req) => {
                let result = server_api::list_tracks(&server, &req.query).map_err(flat);
                ApiEvent::Page(QueryResp {
                    seq: req.seq,
                    result,
                })
            }
            Job::Get { id } => {
                ApiEvent::Fetched(server_api::get_track(&server, &id).map_err(flat))
            }
            Job::Genres => ApiEvent::Genres(server_api::genres(&server).map_err(flat)),
            Job::Artists => ApiEvent::Artists(server_api::artists(&server).map_err(flat)),
            Job::Create(input) => {
                ApiEvent::Created(server_api::create_track(&server, &input).map_err(flat))
            }
            Job::Update { id, input } => {
                ApiEvent::Updated(server_api::update_track(&server, &id, &input).map_err(flat))
            }
            Job::Delete { id } => {
                ApiEvent::Deleted(server_api::delete_track(&server, &id).map_err(flat))
            }
            Job::BulkDelete { ids } => {
                ApiEvent::BulkDeleted(server_api::bulk_delete_tracks(&server, ids).map_err(flat))
            }
            Job::Upload {
                id,
                path,
                file_name,
                mime,
            } => {
                let result = fs::read(&path)
                    .map_err(|e| format!("read {}: {e}", path.display()))
                    .and_then(|bytes| {
                        server_api::upload_audio(&server, &id, &file_name, mime, &bytes)
                            .map_err(flat)
                    });
                ApiEvent::Uploaded(result)
            }
            Job::RemoveAudio { id } => {
                ApiEvent::AudioRemoved(server_api::remove_audio(&server, &id).map_err(flat))
            }
        };
        if evt_tx.send(event).is_err() {
            break;
        }
    }
}
