tonic::include_proto!("ps");
