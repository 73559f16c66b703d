pub mod analysis;
pub mod capture;
pub mod decode;
pub mod features;
pub mod pcm;
pub mod wav;
