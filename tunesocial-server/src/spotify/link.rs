use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::social::PostType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Track,
    Album,
}

impl LinkKind {
    pub fn post_type(&self) -> PostType {
        match self {
            LinkKind::Track => PostType::Track,
            LinkKind::Album => PostType::Album,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpotifyLink {
    pub kind: LinkKind,
    pub id: String,
}

impl SpotifyLink {
    pub fn uri(&self) -> String {
        match self.kind {
            LinkKind::Track => format!("spotify:track:{}", self.id),
            LinkKind::Album => format!("spotify:album:{}", self.id),
        }
    }
}

lazy_static! {
    static ref WEB_LINK: Regex = Regex::new(
        r"^https?://open\.spotify\.com/(?:intl-[A-Za-z-]+/)?(track|album)/([A-Za-z0-9]+)/?(?:[?#].*)?$"
    )
    .unwrap();
    static ref URI_LINK: Regex = Regex::new(r"^spotify:(track|album):([A-Za-z0-9]+)$").unwrap();
}

/// Accepts open.spotify.com track/album links and `spotify:` URIs.
pub fn parse_spotify_link(input: &str) -> Option<SpotifyLink> {
    let input = input.trim();
    let captures = WEB_LINK
        .captures(input)
        .or_else(|| URI_LINK.captures(input))?;
    let kind = match &captures[1] {
        "track" => LinkKind::Track,
        "album" => LinkKind::Album,
        _ => return None,
    };
    Some(SpotifyLink {
        kind,
        id: captures[2].to_string(),
    })
}
