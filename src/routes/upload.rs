use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use chrono::{Datelike, Utc};
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::middleware::AuthUser;

const TAILLE_MAX: usize = 5 * 1024 * 1024; // 5 Mo

fn reponse_upload_invalide(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": { "code": "REQUETE_INVALIDE", "message": message }
    }))
}

fn reponse_erreur_serveur() -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "success": false,
        "error": { "code": "ERREUR_SERVEUR", "message": "Erreur interne du serveur" }
    }))
}

/// POST /api/upload - Upload multipart d'un fichier (PROTÉGÉE, tout rôle)
///
/// Le fichier est stocké sous UPLOAD_DIR/<année>/<mois>/<uuid>.<ext> et
/// l'URL publique correspondante est renvoyée. Le nom d'origine n'est
/// jamais réutilisé, seule son extension est conservée.
#[post("")]
pub async fn upload_fichier(_auth_user: AuthUser, mut payload: Multipart) -> HttpResponse {
    let base = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

    // 1. Premier champ fichier du formulaire
    let mut champ = match payload.try_next().await {
        Ok(Some(champ)) => champ,
        Ok(None) => return reponse_upload_invalide("Aucun fichier reçu"),
        Err(e) => {
            eprintln!("⚠️  Multipart parse error: {}", e);
            return reponse_upload_invalide("Formulaire multipart invalide");
        }
    };

    // 2. Extension depuis le nom d'origine (alphanumérique, 10 caractères max)
    let extension = champ
        .content_disposition()
        .get_filename()
        .and_then(|nom| nom.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());

    // 3. Dossier partitionné par année/mois
    let maintenant = Utc::now();
    let sous_dossier = format!("{}/{:02}", maintenant.year(), maintenant.month());
    let dossier = format!("{}/{}", base, sous_dossier);
    if let Err(e) = tokio::fs::create_dir_all(&dossier).await {
        eprintln!("❌ Failed to create upload directory {}: {}", dossier, e);
        return reponse_erreur_serveur();
    }

    let nom_fichier = format!("{}.{}", Uuid::new_v4(), extension);
    let chemin = format!("{}/{}", dossier, nom_fichier);

    let mut fichier = match tokio::fs::File::create(&chemin).await {
        Ok(fichier) => fichier,
        Err(e) => {
            eprintln!("❌ Failed to create upload file {}: {}", chemin, e);
            return reponse_erreur_serveur();
        }
    };

    // 4. Copier le flux par morceaux, avec plafond de taille
    let mut taille: usize = 0;
    loop {
        match champ.try_next().await {
            Ok(Some(morceau)) => {
                taille += morceau.len();
                if taille > TAILLE_MAX {
                    let _ = tokio::fs::remove_file(&chemin).await;
                    return reponse_upload_invalide("Fichier trop volumineux (5 Mo max)");
                }
                if let Err(e) = fichier.write_all(&morceau).await {
                    eprintln!("❌ Failed to write upload file {}: {}", chemin, e);
                    let _ = tokio::fs::remove_file(&chemin).await;
                    return reponse_erreur_serveur();
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("⚠️  Upload stream interrupted: {}", e);
                let _ = tokio::fs::remove_file(&chemin).await;
                return reponse_upload_invalide("Lecture du fichier interrompue");
            }
        }
    }

    if taille == 0 {
        let _ = tokio::fs::remove_file(&chemin).await;
        return reponse_upload_invalide("Fichier vide");
    }

    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": {
            "url": format!("/uploads/{}/{}", sous_dossier, nom_fichier),
            "taille": taille,
        }
    }))
}

pub fn upload_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/upload").service(upload_fichier));
}
