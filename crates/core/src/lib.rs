pub mod access {
    pub mod domain {
        pub mod access_controller;
        pub mod account;
        pub mod account_store;
        pub mod auth_strategy;
        pub mod password_hash;
        pub mod request_context;
        pub mod trial_policy;
        pub mod trusted_origins;
    }
    pub mod infrastructure;
}

pub mod classification {
    pub mod domain {
        pub mod emotion;
        pub mod emotion_classifier;
        pub mod patch_normalizer;
    }
    pub mod infrastructure;
}

pub mod decoding {
    pub mod image_decoder;
}

pub mod detection {
    pub mod domain {
        pub mod candidate_grouper;
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod infer_emotions_use_case;
    pub mod pipeline_error;
}

pub mod shared {
    pub mod constants;
    pub mod image_buffer;
    pub mod model_resolver;
    pub mod onnx_session;
    pub mod raster;
    pub mod region;
}
