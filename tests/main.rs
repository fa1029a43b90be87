/*!
 * Main test entry point for the ebook-translator test suite
 */

// Import common test utilities
pub mod common;

// Import unit tests
mod unit {
    // File and folder related tests
    pub mod file_utils_tests;

    // Language utilities tests
    pub mod language_utils_tests;

    // App configuration tests
    pub mod app_config_tests;

    // Translation cache tests
    pub mod cache_tests;

    // Engine implementation tests
    pub mod engines_tests;

    // Glossary tests
    pub mod glossary_tests;

    // Extraction and element handling tests
    pub mod element_tests;
}

// Import integration tests
mod integration {
    // End-to-end book translation tests
    pub mod book_workflow_tests;

    // Orchestrator tests against mock engines
    pub mod translation_pipeline_tests;

    // Custom engine against a local HTTP server
    pub mod engine_api_tests;

    // Full app lifecycle tests
    pub mod app_lifecycle_tests;
}
