//! 可观测性模块集成测试
//!
//! 未安装全局 recorder 时各记录函数应静默生效

mod metrics_tests {
    use gophermart_shared::observability::metrics::{
        record_accrual_cooldown, record_accrual_request, record_http_request,
        record_order_update, record_pipeline_error, record_pipeline_errors_dropped,
        record_withdrawal, set_discovered_orders,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/user/orders", 200, 0.05);
        record_http_request("POST", "/api/user/orders", 202, 0.12);
        record_http_request("POST", "/api/user/balance/withdraw", 402, 0.03);
        record_http_request("GET", "/api/not-found", 404, 0.01);
    }

    #[test]
    fn test_record_pipeline_metrics() {
        record_accrual_request("processed", 0.08);
        record_accrual_request("rate_limited", 0.01);
        record_accrual_cooldown(10.0);
        record_order_update("PROCESSED");
        set_discovered_orders(0);
        set_discovered_orders(42);
        record_pipeline_error("scoring");
        record_pipeline_errors_dropped(3);
        record_withdrawal("insufficient_funds");
    }
}

mod tracing_tests {
    use gophermart_shared::observability::tracing::build_filter;

    #[test]
    fn test_build_filter_falls_back_on_garbage() {
        let filter = build_filter("not a [valid filter");
        assert!(!filter.to_string().is_empty());
    }
}

mod middleware_tests {
    use gophermart_shared::observability::middleware::RequestId;

    #[test]
    fn test_request_id() {
        let id = RequestId("req-1".to_string());
        assert_eq!(id.clone().as_str(), "req-1");
        assert!(format!("{:?}", id).contains("req-1"));
    }
}

mod config_tests {
    use gophermart_shared::observability::{ObservabilityConfig, ObservabilityGuard};

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "gophermart");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_with_service_name() {
        let config = ObservabilityConfig::default().with_service_name("mock");
        assert_eq!(config.service_name, "mock");
    }

    #[test]
    fn test_empty_guard() {
        drop(ObservabilityGuard::empty());
    }
}
