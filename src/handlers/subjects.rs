//! Fixed subject catalogue

use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

pub const SUBJECTS: [Subject; 6] = [
    Subject { id: "mathematics", name: "Mathematics", icon: "📐" },
    Subject { id: "science", name: "Science", icon: "🔬" },
    Subject { id: "programming", name: "Programming", icon: "💻" },
    Subject { id: "languages", name: "Languages", icon: "🌍" },
    Subject { id: "history", name: "History", icon: "📚" },
    Subject { id: "literature", name: "Literature", icon: "📖" },
];

#[derive(Debug, Serialize)]
pub struct SubjectsResponse {
    pub subjects: &'static [Subject],
}

/// GET /api/subjects
pub async fn handler() -> Json<SubjectsResponse> {
    Json(SubjectsResponse {
        subjects: &SUBJECTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalogue_is_stable() {
        let Json(body) = handler().await;
        let ids: Vec<_> = body.subjects.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            ["mathematics", "science", "programming", "languages", "history", "literature"]
        );

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["subjects"][2]["icon"], "💻");
        assert_eq!(json["subjects"][0]["name"], "Mathematics");
    }
}
