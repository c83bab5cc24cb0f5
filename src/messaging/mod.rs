mod records;

pub use records::{
    DynamoDbEvent, DynamoDbEventRecord, KinesisEvent, KinesisEventRecord, KinesisRecord,
    RecordBatch,
};
