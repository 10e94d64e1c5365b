//! 日志系统测试模块

#[cfg(test)]
mod tests {
    use crate::logging::{LogConfig, LoggingSystem};
    use log::LevelFilter;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    /// 创建测试用的日志配置
    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        let result1 = LoggingSystem::setup_logging(config.clone());
        assert!(result1.is_ok());
        assert!(LoggingSystem::is_initialized());

        // 第二次初始化不会重复安装 subscriber
        let result2 = LoggingSystem::setup_logging(config);
        assert!(result2.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        let _system = LoggingSystem::setup_logging(config.clone()).unwrap();
        assert!(LoggingSystem::is_initialized());

        let result = LoggingSystem::setup_logging_with_options(config, true);
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());
        config.console = false;

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());
        config.console = false;
        config.json_format = true;

        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
        assert!(!system.config().console);
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_format() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.json_format = true;

        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
    }

    #[test]
    #[serial]
    fn test_current_config_retrieval() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.level = LevelFilter::Debug;
        let _system = LoggingSystem::setup_logging(config.clone()).unwrap();

        let retrieved = LoggingSystem::current_config().unwrap();
        assert_eq!(retrieved.level, LevelFilter::Debug);
        assert_eq!(retrieved.console, config.console);
        assert_eq!(retrieved.json_format, config.json_format);
    }

    #[test]
    #[serial]
    fn test_module_level_filtering() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config
            .module_levels
            .insert("inaira_monitor::poll".to_string(), LevelFilter::Debug);
        config
            .module_levels
            .insert("hyper_util".to_string(), LevelFilter::Warn);

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    fn test_default_config_quiets_http_stack() {
        let config = LogConfig::default();
        assert_eq!(config.level, LevelFilter::Info);
        assert_eq!(
            config.module_levels.get("hyper_util"),
            Some(&LevelFilter::Warn)
        );
    }
}
