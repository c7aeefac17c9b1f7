//! Track query controller: filter, sort, and pagination state driving a
//! debounced remote fetch.
//!
//! The controller never touches the network itself. It pushes sequence-tagged
//! requests onto a channel owned by the API worker and applies a response
//! only when its sequence number matches the most recently issued request,
//! so a slow early response can never overwrite a fresher one.

use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use trackdeck_types::{SortField, SortOrder, Track, TrackPage};

use crate::server_api::TrackQuery;

/// Fixed page size for the track list.
pub(crate) const PAGE_SIZE: u32 = 10;

/// Idle time after the last search keystroke before the query is issued.
pub(crate) const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Observable result status.
///
/// `Loading` means no page has ever loaded for the current session;
/// `Refreshing` means a previous page is still shown stale while a new one
/// loads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QueryStatus {
    Loading,
    Refreshing,
    Ready,
    Error,
}

/// Partial filter update. `None` leaves a field untouched; `Some(None)`
/// clears an optional filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FilterPatch {
    pub(crate) search: Option<String>,
    pub(crate) genre: Option<Option<String>>,
    pub(crate) artist: Option<Option<String>>,
    pub(crate) sort: Option<Option<(SortField, SortOrder)>>,
}

impl FilterPatch {
    fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.genre.is_none()
            && self.artist.is_none()
            && self.sort.is_none()
    }
}

/// A sequence-tagged list request handed to the API worker.
#[derive(Clone, Debug)]
pub(crate) struct QueryReq {
    pub(crate) seq: u64,
    pub(crate) query: TrackQuery,
}

/// Worker response carrying back the request's sequence number.
#[derive(Clone, Debug)]
pub(crate) struct QueryResp {
    pub(crate) seq: u64,
    pub(crate) result: Result<TrackPage, String>,
}

pub(crate) struct QueryController {
    search: String,
    debounced_search: String,
    genre: Option<String>,
    artist: Option<String>,
    sort: Option<(SortField, SortOrder)>,
    page: u32,
    total: u64,
    tracks: Vec<Track>,
    status: QueryStatus,
    error: Option<String>,
    has_loaded: bool,
    seq: u64,
    pending_search_deadline: Option<Instant>,
    req_tx: Sender<QueryReq>,
}

impl QueryController {
    /// Create the controller and issue the initial fetch.
    pub(crate) fn new(req_tx: Sender<QueryReq>) -> Self {
        let mut ctl = Self {
            search: String::new(),
            debounced_search: String::new(),
            genre: None,
            artist: None,
            sort: None,
            page: 1,
            total: 0,
            tracks: Vec::new(),
            status: QueryStatus::Loading,
            error: None,
            has_loaded: false,
            seq: 0,
            pending_search_deadline: None,
            req_tx,
        };
        ctl.issue_fetch();
        ctl
    }

    pub(crate) fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub(crate) fn page(&self) -> u32 {
        self.page
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    /// Always derived from the authoritative total, never stored.
    pub(crate) fn total_pages(&self) -> u32 {
        (self.total.div_ceil(PAGE_SIZE as u64)) as u32
    }

    pub(crate) fn status(&self) -> QueryStatus {
        self.status
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn search(&self) -> &str {
        &self.search
    }

    pub(crate) fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub(crate) fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub(crate) fn sort(&self) -> Option<(SortField, SortOrder)> {
        self.sort
    }

    /// Merge a partial filter update. Touching any field other than search,
    /// or clearing search, resets the page to 1. A search edit is committed
    /// into the outgoing query only after [`SEARCH_DEBOUNCE`] of idle time.
    pub(crate) fn update_filters(&mut self, patch: FilterPatch, now: Instant) {
        if patch.is_empty() {
            return;
        }

        let non_search_touched =
            patch.genre.is_some() || patch.artist.is_some() || patch.sort.is_some();
        let search_cleared = patch.search.as_deref() == Some("");
        if non_search_touched || search_cleared {
            self.page = 1;
        }

        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(artist) = patch.artist {
            self.artist = artist;
        }
        if let Some(sort) = patch.sort {
            self.sort = sort;
        }

        let mut fetch_now = non_search_touched;
        if let Some(search) = patch.search {
            if search.is_empty() {
                // Clearing search takes effect immediately; there is nothing
                // left to debounce.
                self.search = String::new();
                self.debounced_search = String::new();
                self.pending_search_deadline = None;
                fetch_now = true;
            } else {
                self.search = search;
                self.pending_search_deadline = Some(now + SEARCH_DEBOUNCE);
            }
        }

        if fetch_now {
            self.issue_fetch();
        } else {
            // The fetch waits for the debounce timer, but the UI flags the
            // result set as going stale right away.
            self.mark_fetching();
        }
    }

    /// Commit a debounced search edit once its deadline has elapsed.
    pub(crate) fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.pending_search_deadline
            && now >= deadline
        {
            self.pending_search_deadline = None;
            self.debounced_search = self.search.clone();
            self.issue_fetch();
        }
    }

    /// Direct page change. Does not reset filters; callers keep the value in
    /// `[1, total_pages]`.
    pub(crate) fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
        self.issue_fetch();
    }

    /// Re-issue the current query unchanged (error retry, post-mutation
    /// refresh).
    pub(crate) fn refetch(&mut self) {
        self.issue_fetch();
    }

    /// Apply a worker response. Returns `true` when the response was current
    /// and applied; stale responses are dropped.
    pub(crate) fn apply(&mut self, resp: QueryResp) -> bool {
        if resp.seq != self.seq {
            tracing::debug!(seq = resp.seq, latest = self.seq, "dropping stale track page");
            return false;
        }
        match resp.result {
            Ok(page) => {
                self.tracks = page.data;
                self.total = page.meta.total;
                self.error = None;
                self.has_loaded = true;
                self.status = QueryStatus::Ready;
            }
            Err(message) => {
                self.tracks.clear();
                self.total = 0;
                self.error = Some(message);
                self.status = QueryStatus::Error;
            }
        }
        true
    }

    /// Best-effort local replace after a successful edit, pending the next
    /// refetch.
    pub(crate) fn merge_track(&mut self, updated: &Track) {
        if let Some(slot) = self.tracks.iter_mut().find(|t| t.id == updated.id) {
            *slot = updated.clone();
        }
    }

    fn to_query(&self) -> TrackQuery {
        TrackQuery {
            search: if self.debounced_search.is_empty() {
                None
            } else {
                Some(self.debounced_search.clone())
            },
            genre: self.genre.clone(),
            artist: self.artist.clone(),
            sort: self.sort,
            page: self.page,
            limit: PAGE_SIZE,
        }
    }

    fn mark_fetching(&mut self) {
        self.status = if self.has_loaded {
            QueryStatus::Refreshing
        } else {
            QueryStatus::Loading
        };
    }

    fn issue_fetch(&mut self) {
        self.seq += 1;
        self.mark_fetching();
        let req = QueryReq {
            seq: self.seq,
            query: self.to_query(),
        };
        if self.req_tx.send(req).is_err() {
            self.status = QueryStatus::Error;
            self.error = Some("api worker is not available".to_string());
        }
    }
}
