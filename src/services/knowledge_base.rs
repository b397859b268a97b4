use std::sync::Arc;

use crate::errors::StoreError;
use crate::models::{Confirmation, Doctor, Faq, Service};
use crate::services::sheets::{SheetBackend, Tab, WriteLocks};

/// Doctors, services and FAQ entries for one business.
///
/// Adds never check for duplicates. Deletes remove the first row whose key
/// matches and succeed even when nothing matched. Deletes on one tab run one
/// at a time, since a delete renumbers the rows below it.
pub struct KnowledgeBase {
    sheets: Arc<dyn SheetBackend>,
    locks: WriteLocks,
}

fn backend(op: &'static str) -> impl FnOnce(anyhow::Error) -> StoreError {
    move |e| {
        tracing::error!(error = %e, op, "sheet backend failure");
        StoreError::Backend { op }
    }
}

impl KnowledgeBase {
    pub fn new(sheets: Arc<dyn SheetBackend>) -> Self {
        Self {
            sheets,
            locks: WriteLocks::default(),
        }
    }

    async fn delete_first(
        &self,
        sheet_id: &str,
        tab: Tab,
        key_column: &str,
        key: &str,
        op: &'static str,
    ) -> Result<(), StoreError> {
        let _tab = self.locks.tab(sheet_id, tab).await;

        let rows = self
            .sheets
            .query(sheet_id, tab, &[(key_column, key)])
            .await
            .map_err(backend(op))?;

        if let Some(row) = rows.first() {
            self.sheets.delete(sheet_id, row).await.map_err(backend(op))?;
        }
        Ok(())
    }

    // ── Doctors ──

    pub async fn get_doctors(&self, sheet_id: &str) -> Result<Vec<Doctor>, StoreError> {
        let rows = self
            .sheets
            .rows(sheet_id, Tab::Doctors)
            .await
            .map_err(backend("fetch doctors"))?;

        Ok(rows
            .iter()
            .map(|r| Doctor {
                name: r.get("Name").to_string(),
                specialty: r.get("Specialty").to_string(),
                availability: r.get("Availability").to_string(),
            })
            .collect())
    }

    pub async fn add_doctor(
        &self,
        sheet_id: &str,
        doctor: &Doctor,
    ) -> Result<Confirmation, StoreError> {
        self.sheets
            .append(
                sheet_id,
                Tab::Doctors,
                vec![
                    doctor.name.clone(),
                    doctor.specialty.clone(),
                    doctor.availability.clone(),
                ],
            )
            .await
            .map_err(backend("add doctor"))?;
        Ok(Confirmation::ok(format!("Doctor {} added.", doctor.name)))
    }

    pub async fn delete_doctor(
        &self,
        sheet_id: &str,
        name: &str,
    ) -> Result<Confirmation, StoreError> {
        self.delete_first(sheet_id, Tab::Doctors, "Name", name, "delete doctor")
            .await?;
        Ok(Confirmation::ok(format!("Doctor {name} deleted.")))
    }

    // ── Services ──

    pub async fn get_services(&self, sheet_id: &str) -> Result<Vec<Service>, StoreError> {
        let rows = self
            .sheets
            .rows(sheet_id, Tab::Services)
            .await
            .map_err(backend("fetch services"))?;

        Ok(rows
            .iter()
            .map(|r| Service {
                service: r.get("Service").to_string(),
                price: r.get("Price").to_string(),
                description: r.get("Description").to_string(),
            })
            .collect())
    }

    pub async fn add_service(
        &self,
        sheet_id: &str,
        service: &Service,
    ) -> Result<Confirmation, StoreError> {
        self.sheets
            .append(
                sheet_id,
                Tab::Services,
                vec![
                    service.service.clone(),
                    service.price.clone(),
                    service.description.clone(),
                ],
            )
            .await
            .map_err(backend("add service"))?;
        Ok(Confirmation::ok(format!("Service {} added.", service.service)))
    }

    pub async fn delete_service(
        &self,
        sheet_id: &str,
        service: &str,
    ) -> Result<Confirmation, StoreError> {
        self.delete_first(sheet_id, Tab::Services, "Service", service, "delete service")
            .await?;
        Ok(Confirmation::ok(format!("Service {service} deleted.")))
    }

    // ── FAQ ──

    pub async fn get_faq(&self, sheet_id: &str) -> Result<Vec<Faq>, StoreError> {
        let rows = self
            .sheets
            .rows(sheet_id, Tab::Faq)
            .await
            .map_err(backend("fetch FAQ"))?;

        Ok(rows
            .iter()
            .map(|r| Faq {
                question: r.get("Question").to_string(),
                answer: r.get("Answer").to_string(),
            })
            .collect())
    }

    pub async fn add_faq(&self, sheet_id: &str, faq: &Faq) -> Result<Confirmation, StoreError> {
        self.sheets
            .append(
                sheet_id,
                Tab::Faq,
                vec![faq.question.clone(), faq.answer.clone()],
            )
            .await
            .map_err(backend("add FAQ"))?;
        Ok(Confirmation::ok("FAQ added."))
    }

    pub async fn delete_faq(
        &self,
        sheet_id: &str,
        question: &str,
    ) -> Result<Confirmation, StoreError> {
        self.delete_first(sheet_id, Tab::Faq, "Question", question, "delete FAQ")
            .await?;
        Ok(Confirmation::ok("FAQ deleted."))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::db;
    use crate::services::sheets::local::LocalSheets;
    use crate::services::sheets::memory::MemorySheets;

    const SHEET: &str = "sheet-1";

    fn kb() -> KnowledgeBase {
        let conn = db::init_db(":memory:").unwrap();
        KnowledgeBase::new(Arc::new(LocalSheets::new(Arc::new(Mutex::new(conn)))))
    }

    fn doctor(name: &str) -> Doctor {
        Doctor {
            name: name.to_string(),
            specialty: "Orthodontics".to_string(),
            availability: "Sat-Thu".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_collections() {
        let kb = kb();
        assert!(kb.get_doctors(SHEET).await.unwrap().is_empty());
        assert!(kb.get_services(SHEET).await.unwrap().is_empty());
        assert!(kb.get_faq(SHEET).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_doctor_add_then_delete() {
        let kb = kb();
        kb.add_doctor(SHEET, &doctor("Dr. Test")).await.unwrap();
        assert_eq!(kb.get_doctors(SHEET).await.unwrap(), vec![doctor("Dr. Test")]);

        kb.delete_doctor(SHEET, "Dr. Test").await.unwrap();
        assert!(kb.get_doctors(SHEET).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_allowed_and_delete_removes_first() {
        let kb = kb();
        let mut second = doctor("Dr. Test");
        second.specialty = "Endodontics".to_string();
        kb.add_doctor(SHEET, &doctor("Dr. Test")).await.unwrap();
        kb.add_doctor(SHEET, &second).await.unwrap();

        kb.delete_doctor(SHEET, "Dr. Test").await.unwrap();
        assert_eq!(kb.get_doctors(SHEET).await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_success() {
        let kb = kb();
        let res = kb.delete_service(SHEET, "Whitening").await.unwrap();
        assert!(res.success);
        let res = kb.delete_faq(SHEET, "Parking?").await.unwrap();
        assert!(res.success);
    }

    #[tokio::test]
    async fn test_services_and_faq_round_trip() {
        let kb = kb();
        let cleaning = Service {
            service: "Cleaning".to_string(),
            price: "15 OMR".to_string(),
            description: "Scale and polish".to_string(),
        };
        kb.add_service(SHEET, &cleaning).await.unwrap();
        kb.add_faq(
            SHEET,
            &Faq {
                question: "Open Friday?".to_string(),
                answer: "No, closed on Fridays.".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(kb.get_services(SHEET).await.unwrap(), vec![cleaning]);
        assert_eq!(kb.get_faq(SHEET).await.unwrap()[0].answer, "No, closed on Fridays.");

        kb.delete_service(SHEET, "Cleaning").await.unwrap();
        kb.delete_faq(SHEET, "Open Friday?").await.unwrap();
        assert!(kb.get_services(SHEET).await.unwrap().is_empty());
        assert!(kb.get_faq(SHEET).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scoped_per_business_sheet() {
        let kb = kb();
        kb.add_doctor("clinic-a", &doctor("Dr. A")).await.unwrap();
        assert!(kb.get_doctors("clinic-b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_deletes_remove_the_named_doctors() {
        let sheets = Arc::new(MemorySheets::new(Duration::from_millis(20)));
        let kb = KnowledgeBase::new(sheets.clone());
        for name in ["Dr. Ali", "Dr. Badr", "Dr. Chadi"] {
            kb.add_doctor(SHEET, &doctor(name)).await.unwrap();
        }

        let (a, b) = tokio::join!(
            kb.delete_doctor(SHEET, "Dr. Ali"),
            kb.delete_doctor(SHEET, "Dr. Badr"),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(sheets.column(SHEET, Tab::Doctors, "Name"), vec!["Dr. Chadi"]);
    }
}
