use crate::infra::{
    InMemoryBrokerRepository, InMemoryCredentialRepository, InMemoryDocumentStore,
    InMemoryFleetRepository, ScriptedChatGateway, StaticTokenVerifier,
};
use chrono::{Duration, Local, NaiveDate, Utc};
use clap::Args;
use fleetcred::error::AppError;
use fleetcred::workflows::brokers::{
    AssignmentDecision, AssignmentMode, BrokerService, BrokerServiceError, NewBroker, RateEntry,
    RateUpdate, RequestedBy,
};
use fleetcred::workflows::credentials::{
    CredentialCategory, CredentialId, CredentialScope, CredentialService, CredentialServiceError,
    CredentialSubject, CredentialSubmission, CredentialType, EmploymentApplicability,
    ExpirationType, NewCredentialType, RepositoryError, RequirementLevel, ReviewAction,
    SubmissionPayload, SubmissionType,
};
use fleetcred::workflows::fleet::{
    Driver, DriverId, DriverStatus, EmploymentType, FleetRepository, Vehicle, VehicleId,
    VehicleOwnership, VehicleStatus, VehicleType,
};
use fleetcred::workflows::instructions::{
    GenerationMode, GenerationRequest, GenerationResponse, InstructionService,
};
use std::sync::Arc;

type DemoCredentials = CredentialService<
    InMemoryCredentialRepository,
    InMemoryFleetRepository,
    InMemoryDocumentStore,
>;
type DemoBrokers = BrokerService<
    InMemoryBrokerRepository,
    InMemoryCredentialRepository,
    InMemoryFleetRepository,
    InMemoryDocumentStore,
>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Effective date for the demo rate table (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) rates_from: Option<NaiveDate>,
    /// Skip the instruction builder portion of the demo.
    #[arg(long)]
    pub(crate) skip_generation: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        rates_from,
        skip_generation,
    } = args;
    let rates_from = rates_from.unwrap_or_else(|| Local::now().date_naive());

    println!("Fleet credentialing demo");

    let repository = Arc::new(InMemoryCredentialRepository::default());
    let fleet = Arc::new(InMemoryFleetRepository::default());
    let store = Arc::new(InMemoryDocumentStore::default());
    let credentials = Arc::new(CredentialService::new(repository, fleet.clone(), store));
    let brokers = BrokerService::new(
        Arc::new(InMemoryBrokerRepository::default()),
        credentials.clone(),
        fleet.clone(),
    );

    println!("\nCredential catalog");
    let catalog = match seed_catalog(&credentials) {
        Ok(catalog) => catalog,
        Err(err) => {
            println!("  Catalog seeding failed: {}", err);
            return Ok(());
        }
    };

    println!("\nFleet");
    let (driver, vehicle) = match seed_fleet(fleet.as_ref()) {
        Ok(seeded) => seeded,
        Err(err) => {
            println!("  Fleet seeding failed: {}", err);
            return Ok(());
        }
    };

    println!("\nDriver credential intake");
    if let Err(err) = driver_intake(&credentials, &catalog, &driver) {
        println!("  Credential intake failed: {}", err);
        return Ok(());
    }

    println!("\nVehicle credential intake");
    let insurance_id = match vehicle_intake(&credentials, &catalog, &vehicle) {
        Ok(id) => id,
        Err(err) => {
            println!("  Vehicle intake failed: {}", err);
            return Ok(());
        }
    };

    println!("\nBroker network");
    if let Err(err) = broker_network(&brokers, &credentials, &driver, &insurance_id, rates_from) {
        println!("  Broker workflow failed: {}", err);
        return Ok(());
    }

    println!("\nDriver dashboard");
    if let Err(err) = dashboard(&credentials, &driver) {
        println!("  Dashboard unavailable: {}", err);
        return Ok(());
    }

    if skip_generation {
        return Ok(());
    }

    println!("\nInstruction builder (scripted model)");
    instruction_builder().await;

    Ok(())
}

struct DemoCatalog {
    license: CredentialType,
    insurance: CredentialType,
    background: CredentialType,
}

fn seed_catalog(credentials: &DemoCredentials) -> Result<DemoCatalog, CredentialServiceError> {
    let license = activate(
        credentials,
        NewCredentialType {
            name: "Driver License".to_string(),
            description: Some("State-issued license, front and back".to_string()),
            category: CredentialCategory::Driver,
            scope: CredentialScope::Global,
            broker_id: None,
            employment_type: EmploymentApplicability::Both,
            requirement: RequirementLevel::Required,
            vehicle_types: Vec::new(),
            submission_type: SubmissionType::DocumentUpload,
            requires_driver_action: None,
            form_schema: None,
            signature_document_path: None,
            expiration_type: ExpirationType::FixedInterval,
            expiration_interval_days: Some(365),
            expiration_warning_days: Some(30),
            grace_period_days: None,
            instruction_config: None,
            display_order: 1,
        },
    )?;
    let background = activate(
        credentials,
        NewCredentialType {
            name: "Background Check".to_string(),
            description: None,
            category: CredentialCategory::Driver,
            scope: CredentialScope::Global,
            broker_id: None,
            employment_type: EmploymentApplicability::Both,
            requirement: RequirementLevel::Required,
            vehicle_types: Vec::new(),
            submission_type: SubmissionType::AdminVerified,
            requires_driver_action: Some(false),
            form_schema: None,
            signature_document_path: None,
            expiration_type: ExpirationType::Never,
            expiration_interval_days: None,
            expiration_warning_days: None,
            grace_period_days: None,
            instruction_config: None,
            display_order: 2,
        },
    )?;
    let insurance = activate(
        credentials,
        NewCredentialType {
            name: "Vehicle Insurance".to_string(),
            description: Some("Current insurance card for the vehicle".to_string()),
            category: CredentialCategory::Vehicle,
            scope: CredentialScope::Global,
            broker_id: None,
            employment_type: EmploymentApplicability::Both,
            requirement: RequirementLevel::Required,
            vehicle_types: Vec::new(),
            submission_type: SubmissionType::DocumentUpload,
            requires_driver_action: None,
            form_schema: None,
            signature_document_path: None,
            expiration_type: ExpirationType::DriverSpecified,
            expiration_interval_days: None,
            expiration_warning_days: Some(30),
            grace_period_days: None,
            instruction_config: None,
            display_order: 3,
        },
    )?;
    Ok(DemoCatalog {
        license,
        insurance,
        background,
    })
}

fn activate(
    credentials: &DemoCredentials,
    draft: NewCredentialType,
) -> Result<CredentialType, CredentialServiceError> {
    let row = credentials.create_type(draft)?;
    let row = credentials.activate_type(&row.id)?;
    println!(
        "- {} ({:?}, {:?}, {})",
        row.name,
        row.category,
        row.requirement,
        row.submission_type.label()
    );
    Ok(row)
}

fn seed_fleet(
    fleet: &InMemoryFleetRepository,
) -> Result<(Driver, Vehicle), RepositoryError> {
    let driver = fleet.insert_driver(Driver {
        id: DriverId("driver-demo".to_string()),
        company_id: "company-demo".to_string(),
        full_name: "Marisol Vega".to_string(),
        employment_type: EmploymentType::Contractor1099,
        state: Some("TX".to_string()),
        status: DriverStatus::Active,
        created_at: Utc::now() - Duration::days(45),
    })?;
    let vehicle = fleet.insert_vehicle(Vehicle {
        id: VehicleId("vehicle-demo".to_string()),
        company_id: "company-demo".to_string(),
        make: "Toyota".to_string(),
        model: "Sienna".to_string(),
        year: 2022,
        vehicle_type: VehicleType::Van,
        ownership: VehicleOwnership::Driver,
        owner_driver_id: Some(driver.id.clone()),
        seat_capacity: 6,
        wheelchair_capacity: 0,
        status: VehicleStatus::Active,
        exterior_photo_path: None,
        created_at: Utc::now() - Duration::days(45),
    })?;
    println!(
        "- Driver {} ({}, {})",
        driver.full_name,
        driver.employment_type.label(),
        driver.state.as_deref().unwrap_or("no state on file")
    );
    println!(
        "- Vehicle {} {} {} ({}, {} seats)",
        vehicle.year,
        vehicle.make,
        vehicle.model,
        vehicle.vehicle_type.label(),
        vehicle.seat_capacity
    );
    Ok((driver, vehicle))
}

fn driver_intake(
    credentials: &DemoCredentials,
    catalog: &DemoCatalog,
    driver: &Driver,
) -> Result<(), CredentialServiceError> {
    let subject = CredentialSubject::Driver(driver.id.clone());

    let license = credentials.ensure(subject.clone(), &catalog.license.id)?;
    let stored = credentials.store_document(
        &license.id,
        "license-front.jpg",
        b"demo license scan".to_vec(),
        mime_guess::from_path("license-front.jpg").first_or_octet_stream(),
    )?;
    println!(
        "- Stored {} ({} bytes, {})",
        stored.path, stored.size_bytes, stored.content_type
    );
    credentials.submit(
        &license.id,
        CredentialSubmission {
            payload: SubmissionPayload::Document {
                path: stored.path.clone(),
            },
            notes: Some("Front and back scan".to_string()),
            expires_at: None,
        },
    )?;
    let approved = credentials.review(
        &license.id,
        "ops-admin",
        ReviewAction::Approve {
            expires_at: None,
            notes: None,
        },
    )?;
    println!(
        "- {} approved, expires {}",
        catalog.license.name,
        approved
            .expires_at
            .map(|at| at.date_naive().to_string())
            .unwrap_or_else(|| "never".to_string())
    );

    let signed = credentials.signed_url(&stored.path)?;
    println!("- Display URL (1h): {}", signed.url);

    let background = credentials.ensure(subject, &catalog.background.id)?;
    credentials.review(
        &background.id,
        "ops-admin",
        ReviewAction::Verify {
            expires_at: None,
            notes: Some("County records clear".to_string()),
        },
    )?;
    println!("- {} verified by ops-admin", catalog.background.name);

    let history = credentials.history(&license.id)?;
    println!("- {} audit trail ({} entries):", catalog.license.name, history.len());
    for entry in &history {
        println!(
            "  - {:?}: {} -> {} by {}",
            entry.action,
            entry.from_status.label(),
            entry.to_status.label(),
            entry.actor
        );
    }
    Ok(())
}

fn vehicle_intake(
    credentials: &DemoCredentials,
    catalog: &DemoCatalog,
    vehicle: &Vehicle,
) -> Result<CredentialId, CredentialServiceError> {
    let insurance = credentials.ensure(
        CredentialSubject::Vehicle(vehicle.id.clone()),
        &catalog.insurance.id,
    )?;
    let stored = credentials.store_document(
        &insurance.id,
        "insurance-card.pdf",
        b"demo insurance card".to_vec(),
        mime_guess::from_path("insurance-card.pdf").first_or_octet_stream(),
    )?;
    let expires_at = Utc::now() + Duration::days(180);
    let submitted = credentials.submit(
        &insurance.id,
        CredentialSubmission {
            payload: SubmissionPayload::Document { path: stored.path },
            notes: None,
            expires_at: Some(expires_at),
        },
    )?;
    println!(
        "- {} submitted (policy runs to {}), status {}",
        catalog.insurance.name,
        expires_at.date_naive(),
        submitted.status.label()
    );
    Ok(insurance.id)
}

fn broker_network(
    brokers: &DemoBrokers,
    credentials: &DemoCredentials,
    driver: &Driver,
    insurance_id: &CredentialId,
    rates_from: NaiveDate,
) -> Result<(), BrokerServiceError> {
    let broker = brokers.create_broker(NewBroker {
        company_id: "company-demo".to_string(),
        name: "Lone Star Medical Transit".to_string(),
        contract_number: Some("LSMT-2026-118".to_string()),
        notes: None,
        service_states: vec!["TX".to_string(), "OK".to_string()],
        accepted_vehicle_types: vec![VehicleType::Van, VehicleType::Sedan],
        accepted_employment_types: vec![EmploymentType::W2, EmploymentType::Contractor1099],
        assignment_mode: AssignmentMode::DriverRequests,
    })?;
    println!(
        "- {} (states {}, {:?})",
        broker.name,
        broker.service_states.join("/"),
        broker.assignment_mode
    );

    let packet = credentials.create_type(NewCredentialType {
        name: "Provider Agreement".to_string(),
        description: Some("Broker onboarding packet, signed".to_string()),
        category: CredentialCategory::Driver,
        scope: CredentialScope::Broker,
        broker_id: Some(broker.id.clone()),
        employment_type: EmploymentApplicability::Both,
        requirement: RequirementLevel::Required,
        vehicle_types: Vec::new(),
        submission_type: SubmissionType::Signature,
        requires_driver_action: None,
        form_schema: None,
        signature_document_path: Some("brokers/lsmt/provider-agreement.pdf".to_string()),
        expiration_type: ExpirationType::Never,
        expiration_interval_days: None,
        expiration_warning_days: None,
        grace_period_days: None,
        instruction_config: None,
        display_order: 10,
    })?;
    credentials.activate_type(&packet.id)?;
    println!("- Broker packet: {}", packet.name);

    let report = brokers.eligibility(&driver.id, &broker.id)?;
    print_eligibility(&broker.name, report.eligible, &report.issues);

    credentials.review(
        insurance_id,
        "ops-admin",
        ReviewAction::Approve {
            expires_at: None,
            notes: None,
        },
    )?;
    println!("- Reviewer approved the insurance card");

    let report = brokers.eligibility(&driver.id, &broker.id)?;
    print_eligibility(&broker.name, report.eligible, &report.issues);

    let assignment = brokers.join(&driver.id, &broker.id, RequestedBy::Driver, "driver-app")?;
    println!("- Join request -> {:?}", assignment.status);
    let decided = brokers.decide(&assignment.id, "ops-admin", AssignmentDecision::Approve)?;
    println!(
        "- Admin decision -> {:?} (by {})",
        decided.status,
        decided.decided_by.as_deref().unwrap_or("unknown")
    );

    // Assignment backfilled the packet row; the driver signs it now.
    let agreement = credentials.ensure(
        CredentialSubject::Driver(driver.id.clone()),
        &packet.id,
    )?;
    credentials.submit(
        &agreement.id,
        CredentialSubmission {
            payload: SubmissionPayload::Signature {
                signature_data: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            },
            notes: None,
            expires_at: None,
        },
    )?;
    credentials.review(
        &agreement.id,
        "ops-admin",
        ReviewAction::Approve {
            expires_at: None,
            notes: None,
        },
    )?;
    println!("- {} signed and approved", packet.name);

    let inserted = brokers.update_rates(
        &broker.id,
        RateUpdate {
            effective_from: rates_from,
            rates: vec![
                RateEntry {
                    vehicle_type: VehicleType::Van,
                    base_rate_cents: 4500,
                    per_mile_cents: 185,
                },
                RateEntry {
                    vehicle_type: VehicleType::Sedan,
                    base_rate_cents: 3200,
                    per_mile_cents: 140,
                },
            ],
        },
    )?;
    println!("- Rate table effective {}:", rates_from);
    for row in &inserted {
        println!(
            "  - {}: ${:.2} base | ${:.2} per mile",
            row.vehicle_type.label(),
            f64::from(row.base_rate_cents) / 100.0,
            f64::from(row.per_mile_cents) / 100.0
        );
    }

    for summary in brokers.brokers_for_driver(&driver.id)? {
        println!(
            "- {} join state: {:?}",
            summary.broker.name, summary.join
        );
    }
    Ok(())
}

fn print_eligibility(broker_name: &str, eligible: bool, issues: &[String]) {
    if eligible {
        println!("- Eligibility for {}: eligible", broker_name);
    } else {
        println!("- Eligibility for {}: blocked", broker_name);
        for issue in issues {
            println!("  - {}", issue);
        }
    }
}

fn dashboard(
    credentials: &DemoCredentials,
    driver: &Driver,
) -> Result<(), CredentialServiceError> {
    let view = credentials.credentials_for_driver(&driver.id)?;
    println!(
        "- Progress {}% ({} of {} complete, {} pending, {} action needed)",
        view.progress.percentage,
        view.progress.complete,
        view.progress.total,
        view.progress.pending,
        view.progress.action_needed
    );
    for row in &view.credentials {
        println!(
            "  - {}: {}",
            row.credential_type.name,
            row.display_status.label()
        );
    }

    let stats = credentials.review_stats()?;
    println!(
        "- Review desk: {} pending review | {} awaiting verification | {} expiring soon | {} total",
        stats.pending_review, stats.awaiting_verification, stats.expiring_soon, stats.total
    );
    Ok(())
}

async fn instruction_builder() {
    let gateway = Arc::new(ScriptedChatGateway::with_replies(&[DEMO_INSTRUCTION_REPLY]));
    let verifier = Arc::new(StaticTokenVerifier::new(vec!["demo-token".to_string()]));
    let builder = InstructionService::new(gateway, verifier);

    let request = GenerationRequest {
        mode: GenerationMode::Generate,
        prompt: Some(
            "Drivers upload their insurance card, we pull the policy number and expiration \
             date from it, then they sign the coverage acknowledgement."
                .to_string(),
        ),
        credential_name: Some("Vehicle Insurance".to_string()),
        messages: Vec::new(),
        existing_config: None,
        component_response: None,
        pending_documents: Vec::new(),
    };

    match builder.generate(request).await {
        Ok(GenerationResponse::Config { config }) => {
            println!(
                "- Generated a {}-step flow (schema v{})",
                config.steps.len(),
                config.version
            );
            for step in &config.steps {
                println!(
                    "  - {} [{:?}] with {} block(s)",
                    step.title,
                    step.kind,
                    step.blocks.len()
                );
            }
        }
        Ok(_) => println!("  Unexpected reply shape from the scripted model"),
        Err(err) => println!("  Generation unavailable: {}", err),
    }
}

const DEMO_INSTRUCTION_REPLY: &str = r#"{
  "version": 2,
  "settings": {
    "showProgressBar": true,
    "allowStepSkip": false,
    "completionBehavior": "all_steps",
    "externalSubmissionAllowed": false
  },
  "steps": [
    {
      "id": "step-1",
      "order": 1,
      "title": "Upload your insurance card",
      "type": "document_upload",
      "required": true,
      "blocks": [
        {
          "id": "block-1",
          "order": 1,
          "type": "paragraph",
          "content": {
            "text": "Upload a clear photo or scan of your current insurance card."
          }
        },
        {
          "id": "block-2",
          "order": 2,
          "type": "document",
          "content": {
            "uploadLabel": "Insurance card",
            "acceptedTypes": ["application/pdf", "image/jpeg", "image/png"],
            "maxSizeMB": 10,
            "required": true,
            "extractionFields": [
              {
                "id": "field-1",
                "key": "policy_number",
                "label": "Policy number",
                "type": "text",
                "required": true,
                "source": "ai_generated"
              },
              {
                "id": "field-2",
                "key": "expiration_date",
                "label": "Expiration date",
                "type": "date",
                "required": true,
                "source": "ai_generated"
              }
            ]
          }
        }
      ],
      "completion": { "type": "form_submit" }
    },
    {
      "id": "step-2",
      "order": 2,
      "title": "Sign the coverage acknowledgement",
      "type": "signature",
      "required": true,
      "blocks": [
        {
          "id": "block-3",
          "order": 1,
          "type": "signature_pad",
          "content": {
            "label": "Sign here",
            "required": true,
            "allowTyped": true,
            "allowDrawn": true,
            "agreementText": "I confirm this policy is current and covers commercial transport."
          }
        }
      ],
      "completion": { "type": "form_submit" }
    }
  ]
}"#;
