//! Shared fixture for database-backed tests

use crate::db::Database;
use crate::lang::Language;
use crate::models::{
    Category, Keyword, Ministry, ProcedureStep, RequiredDocument, Sector, SubCategory, TaxConcept,
};
use crate::text::MultilingualText;

fn text(es: &str, fr: &str) -> MultilingualText {
    MultilingualText::from_pairs([(Language::Es, es), (Language::Fr, fr)])
}

/// Two ministries; T-001 and T-002 under M-001, T-003 under M-002.
///
/// - T-001 Pasaporte: fees 1000 / 500, three procedure steps, two documents
/// - T-002 Certificado: fees 2000 / 100, keywords `prueba` (es) and `essai` (fr)
/// - T-003 Visado: no fees
pub(crate) async fn sample_catalog() -> Database {
    let db = Database::open_in_memory().await.unwrap();

    db.ministries_store()
        .insert_batch(&[
            Ministry { id: "M-001".into(), name: text("Hacienda", "Finances") },
            Ministry { id: "M-002".into(), name: text("Interior", "Intérieur") },
        ])
        .await
        .unwrap();
    db.sectors_store()
        .insert_batch(&[
            Sector { id: "S-001".into(), ministry_id: "M-001".into(), name: text("Documentos", "Documents") },
            Sector { id: "S-002".into(), ministry_id: "M-001".into(), name: text("Aduanas", "Douanes") },
            Sector { id: "S-003".into(), ministry_id: "M-002".into(), name: text("Extranjería", "Étrangers") },
        ])
        .await
        .unwrap();
    db.categories_store()
        .insert_batch(&[
            Category { id: "C-001".into(), sector_id: "S-001".into(), name: text("Identidad", "Identité") },
            Category { id: "C-002".into(), sector_id: "S-003".into(), name: text("Visados", "Visas") },
        ])
        .await
        .unwrap();
    db.sub_categories_store()
        .insert_batch(&[
            SubCategory { id: "SC-001".into(), category_id: "C-001".into(), name: None },
            SubCategory { id: "SC-002".into(), category_id: "C-002".into(), name: Some(text("Entrada", "Entrée")) },
        ])
        .await
        .unwrap();

    db.concepts_store()
        .insert_batch(&[
            TaxConcept::new("T-001", "SC-001", text("Pasaporte", "Passeport"))
                .with_fees(Some("1000"), Some("500")),
            TaxConcept::new("T-002", "SC-001", text("Certificado", "Certificat"))
                .with_fees(Some("2000"), Some("100")),
            TaxConcept::new("T-003", "SC-002", text("Visado", "Visa")),
        ])
        .await
        .unwrap();

    let steps: Vec<ProcedureStep> = [("Pago", "Paiement", 2), ("Solicitud", "Demande", 1), ("Recogida", "Retrait", 3)]
        .into_iter()
        .map(|(es, fr, position)| ProcedureStep {
            id: None,
            concept_id: "T-001".into(),
            description: text(es, fr),
            position: Some(position),
        })
        .collect();
    db.procedure_steps_store().insert_batch(&steps).await.unwrap();

    db.documents_store()
        .insert_batch(&[
            RequiredDocument { id: None, concept_id: "T-001".into(), name: text("Foto", "Photo"), description: None },
            RequiredDocument {
                id: None,
                concept_id: "T-001".into(),
                name: text("DNI", "Carte d'identité"),
                description: Some(MultilingualText::legacy("Original y copia")),
            },
        ])
        .await
        .unwrap();

    db.keywords_store()
        .insert_batch(&[
            Keyword::new("T-002", "prueba", Language::Es),
            Keyword::new("T-002", "essai", Language::Fr),
        ])
        .await
        .unwrap();

    db
}
