use parliament::config::{
    ProviderCredentials, AZURE_API_ENDPOINT, AZURE_API_KEY, AZURE_API_VERSION,
    AZURE_DEPLOYMENT_NAME, GROK_DEPLOYMENT_NAME, GROK_ENDPOINT, OPENAI_API_KEY,
};
use parliament::factory::{ClientFactory, FactoryError, Provider};
use parliament::{ModelFamily, ModelInfo};
use std::collections::HashMap;

const AZURE_VARS: [&str; 4] = [
    AZURE_API_KEY,
    AZURE_API_VERSION,
    AZURE_API_ENDPOINT,
    AZURE_DEPLOYMENT_NAME,
];

fn credentials(pairs: &[(&str, &str)]) -> ProviderCredentials {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ProviderCredentials::from_lookup(|key| env.get(key).cloned())
}

fn full_environment() -> ProviderCredentials {
    credentials(&[
        (AZURE_API_KEY, "azure-secret-key-1234"),
        (AZURE_API_VERSION, "2024-02-01"),
        (AZURE_API_ENDPOINT, "https://parliament.openai.azure.com/"),
        (AZURE_DEPLOYMENT_NAME, "gpt-4o"),
        (GROK_DEPLOYMENT_NAME, "grok-3"),
        (GROK_ENDPOINT, "https://parliament.services.ai.azure.com/models"),
        (OPENAI_API_KEY, "sk-test-openai-key"),
    ])
}

#[test]
fn test_azure_requires_every_variable() {
    for mask in 0..15u8 {
        let pairs: Vec<(&str, &str)> = AZURE_VARS
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, var)| (*var, "value"))
            .collect();
        let creds = credentials(&pairs);
        let factory = ClientFactory::new(&creds);
        assert!(
            factory.create_client(Provider::Azure).is_none(),
            "subset {:04b} should not produce a client",
            mask
        );
    }

    let creds = credentials(&AZURE_VARS.iter().map(|v| (*v, "value")).collect::<Vec<_>>());
    assert!(ClientFactory::new(&creds)
        .create_client(Provider::Azure)
        .is_some());
}

#[test]
fn test_blank_values_count_as_missing() {
    let creds = credentials(&[
        (AZURE_API_KEY, "key"),
        (AZURE_API_VERSION, "2024-02-01"),
        (AZURE_API_ENDPOINT, "   "),
        (AZURE_DEPLOYMENT_NAME, "gpt-4o"),
    ]);
    assert!(ClientFactory::new(&creds)
        .create_client(Provider::Azure)
        .is_none());
}

#[test]
fn test_every_provider_available_with_full_environment() {
    let creds = full_environment();
    let factory = ClientFactory::new(&creds);
    for provider in Provider::ALL.iter() {
        assert!(creds.is_available(*provider));
        assert!(factory.create_client(*provider).is_some(), "{}", provider);
    }
}

#[test]
fn test_empty_environment_yields_no_clients() {
    let creds = credentials(&[]);
    let factory = ClientFactory::new(&creds);
    for provider in Provider::ALL.iter() {
        assert!(factory.create_client(*provider).is_none());
    }
}

#[test]
fn test_grok_shares_the_azure_key() {
    let creds = credentials(&[
        (GROK_DEPLOYMENT_NAME, "grok-3"),
        (GROK_ENDPOINT, "https://parliament.services.ai.azure.com/models"),
    ]);
    assert!(ClientFactory::new(&creds)
        .create_client(Provider::Grok)
        .is_none());

    let creds = credentials(&[
        (AZURE_API_KEY, "azure-secret-key-1234"),
        (GROK_DEPLOYMENT_NAME, "grok-3"),
        (GROK_ENDPOINT, "https://parliament.services.ai.azure.com/models"),
    ]);
    let grok = ClientFactory::new(&creds)
        .create_client(Provider::Grok)
        .unwrap();
    assert_eq!(grok.model_name(), "grok-3");
}

#[test]
fn test_grok_endpoint_must_be_absolute_url() {
    for endpoint in &["grok.example.com/v1", "not a url", "/models"] {
        let creds = credentials(&[
            (AZURE_API_KEY, "azure-secret-key-1234"),
            (GROK_DEPLOYMENT_NAME, "grok-3"),
            (GROK_ENDPOINT, endpoint),
        ]);
        assert!(
            ClientFactory::new(&creds)
                .create_client(Provider::Grok)
                .is_none(),
            "endpoint {:?} should not produce a client",
            endpoint
        );
    }
}

#[test]
fn test_client_capabilities() {
    let creds = full_environment();
    let factory = ClientFactory::new(&creds);

    let azure = factory.create_client(Provider::Azure).unwrap();
    assert_eq!(azure.model_name(), "gpt-4o");
    assert_eq!(azure.model_info(), ModelInfo::text_chat(ModelFamily::Unknown));

    let grok = factory.create_client(Provider::Grok).unwrap();
    let info = grok.model_info();
    assert!(!info.vision);
    assert!(info.function_calling);
    assert!(info.json_output);
    assert!(info.structured_output);
    assert_eq!(info.family, ModelFamily::Unknown);

    let openai = factory.create_client(Provider::OpenAI).unwrap();
    assert_eq!(openai.model_name(), "gpt-4");
    assert_eq!(openai.model_info().family, ModelFamily::OpenAI);
}

#[test]
fn test_create_by_name() {
    let creds = full_environment();
    let factory = ClientFactory::new(&creds);

    assert!(factory.create_client_by_name("azure").unwrap().is_some());
    assert!(factory.create_client_by_name("grok").unwrap().is_some());
    assert!(factory.create_client_by_name("openai").unwrap().is_some());

    for bogus in &["", "Azure", "claude", "open ai"] {
        match factory.create_client_by_name(bogus) {
            Err(FactoryError::InvalidArgument(name)) => assert_eq!(&name, bogus),
            _ => panic!("expected InvalidArgument for {:?}", bogus),
        }
    }
}

#[test]
fn test_known_name_without_credentials_is_none() {
    let creds = credentials(&[]);
    let factory = ClientFactory::new(&creds);
    assert!(matches!(factory.create_client_by_name("openai"), Ok(None)));
}

#[test]
fn test_unknown_name_message() {
    let err = "mistral".parse::<Provider>().unwrap_err();
    assert_eq!(err.to_string(), "Unknown client type: mistral");
}
