use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::trace;
use percent_encoding::percent_decode_str;
use tokio::fs;
use warp::filters::fs::File;
use warp::filters::BoxedFilter;
use warp::path::FullPath;
use warp::{Filter, Rejection, Reply};

use crate::gateway::Gateway;

const PAGES: [&str; 4] = ["index.html", "login.html", "signup.html", "serverstatus.html"];

/// The realtime channel, `GET /socket` upgraded to a websocket.
pub fn socket(
    gateway: Arc<Gateway>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("socket")
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let gateway = Arc::clone(&gateway);
            ws.on_upgrade(move |socket| gateway.connection(socket))
        })
}

fn page(dir: &Path, name: &'static str) -> BoxedFilter<(File,)> {
    warp::path(name)
        .and(warp::path::end())
        .and(warp::fs::file(dir.join(name)))
        .boxed()
}

/// Rejects as not found when the request path runs through a regular
/// file, e.g. `/style.css/x`. Opening that fails with ENOTDIR, which
/// `fs::dir` would otherwise answer with a 500.
fn no_file_in_path(root: PathBuf) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    // `full()` rather than `tail()`: the tail must stay unmatched for `fs::dir`
    warp::path::full()
        .and_then(move |full: FullPath| {
            let mut path = root.clone();
            async move {
                let tail = full.as_str().trim_start_matches('/');
                let Ok(decoded) = percent_decode_str(tail).decode_utf8() else {
                    return Err(warp::reject::not_found());
                };

                let mut segments = decoded.split('/').peekable();
                while let Some(seg) = segments.next() {
                    if segments.peek().is_none() || seg.starts_with("..") {
                        break;
                    }
                    path.push(seg);

                    let is_file = fs::metadata(&path)
                        .await
                        .map(|m| m.is_file())
                        .unwrap_or(false);
                    if is_file {
                        trace!("{path:?} is a file, can't descend into it");
                        return Err(warp::reject::not_found());
                    }
                }

                Ok(())
            }
        })
        .untuple_one()
}

/// The asset directory, then the named pages, so a file in the asset
/// directory wins over a page of the same name. GET and HEAD only;
/// misses fall through to warp's 404.
pub fn pages(
    pages_dir: &Path,
    public_dir: &Path,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let [index, login, signup, serverstatus] = PAGES;

    let assets = no_file_in_path(public_dir.to_path_buf())
        .and(warp::fs::dir(public_dir.to_path_buf()));
    let root = warp::path::end().and(warp::fs::file(pages_dir.join(index)));
    let named = page(pages_dir, index)
        .or(page(pages_dir, login))
        .unify()
        .or(page(pages_dir, signup))
        .unify()
        .or(page(pages_dir, serverstatus))
        .unify();

    warp::get()
        .or(warp::head())
        .unify()
        .and(assets.or(root).unify().or(named).unify())
}
