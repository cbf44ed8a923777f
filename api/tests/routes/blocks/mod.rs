mod relay_test;
mod settings_test;
mod upload_test;
