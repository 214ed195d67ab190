use sea_orm::*;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::notifications;

/// Événement poussé aux clients connectés au flux SSE.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub notification_id: i32,
    pub user_id: i32,
    pub titre: String,
    pub message: String,
    pub type_notification: String,
}

/// Canal de diffusion des notifications, partagé par tout le processus via
/// web::Data.
///
/// Livraison at-most-once pour les abonnés connectés : un client absent ou
/// en retard rate des événements. La table notifications reste la source
/// durable, relue par GET /api/notifications.
pub struct NotificationHub {
    tx: broadcast::Sender<NotificationEvent>,
}

impl NotificationHub {
    pub fn new(capacite: usize) -> Self {
        let (tx, _) = broadcast::channel(capacite);
        NotificationHub { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, evenement: NotificationEvent) {
        // Aucun abonné = envoi simplement perdu, la ligne en base fait foi
        let _ = self.tx.send(evenement);
    }
}

pub struct NotificationService;

impl NotificationService {
    /// Persiste une notification puis la pousse aux abonnés connectés.
    ///
    /// Les appelants traitent cet envoi comme un effet de bord hors
    /// transaction : un échec est signalé mais ne fait pas échouer
    /// l'opération métier qui l'a déclenché.
    pub async fn envoyer(
        db: &DatabaseConnection,
        hub: &NotificationHub,
        user_id: i32,
        type_notification: &str,
        titre: &str,
        message: &str,
    ) -> Result<notifications::Model, DbErr> {
        let nouvelle = notifications::ActiveModel {
            user_id: Set(user_id),
            titre: Set(titre.to_string()),
            message: Set(message.to_string()),
            type_notification: Set(type_notification.to_string()),
            lu: Set(false),
            created_at: Set(Some(Utc::now().naive_utc())),
            ..Default::default()
        };
        let notification = nouvelle.insert(db).await?;

        hub.publish(NotificationEvent {
            notification_id: notification.id,
            user_id,
            titre: titre.to_string(),
            message: message.to_string(),
            type_notification: type_notification.to_string(),
        });

        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_sans_abonne_ne_panique_pas() {
        let hub = NotificationHub::new(8);
        hub.publish(NotificationEvent {
            notification_id: 1,
            user_id: 42,
            titre: "t".to_string(),
            message: "m".to_string(),
            type_notification: "reservation".to_string(),
        });
    }

    #[test]
    fn test_abonne_recoit_l_evenement() {
        let hub = NotificationHub::new(8);
        let mut rx = hub.subscribe();

        hub.publish(NotificationEvent {
            notification_id: 7,
            user_id: 42,
            titre: "Réservation confirmée".to_string(),
            message: "Votre réservation a été confirmée".to_string(),
            type_notification: "reservation".to_string(),
        });

        let recu = rx.try_recv().unwrap();
        assert_eq!(recu.notification_id, 7);
        assert_eq!(recu.user_id, 42);
    }
}
