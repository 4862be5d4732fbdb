pub mod td3;
